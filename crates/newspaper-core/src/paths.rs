use crate::error::{NewspaperError, Result};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = ".config/newspaper.yaml";
pub const DEFAULT_ROOT: &str = "~/newspaper";

pub fn home_dir() -> Result<PathBuf> {
    home::home_dir().ok_or(NewspaperError::HomeNotFound)
}

/// `~/.config/newspaper.yaml`
pub fn default_config_path() -> Result<PathBuf> {
    Ok(home_dir()?.join(CONFIG_FILE))
}

/// Resolve the config file: an explicit path wins over the default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(p) => expand_tilde(p),
        None => default_config_path(),
    }
}

/// Replace a leading `~` component with the home directory.
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    match path.strip_prefix("~") {
        Ok(rest) => Ok(home_dir()?.join(rest)),
        Err(_) => Ok(path.to_path_buf()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_paths_unchanged() {
        let p = Path::new("/var/notes");
        assert_eq!(expand_tilde(p).unwrap(), p);
    }

    #[test]
    fn tilde_prefix_only_matches_whole_component() {
        let p = Path::new("~notes/today");
        assert_eq!(expand_tilde(p).unwrap(), p);
    }

    #[test]
    fn tilde_expands_to_home() {
        let Ok(home) = home_dir() else {
            return;
        };
        assert_eq!(expand_tilde(Path::new("~/newspaper")).unwrap(), home.join("newspaper"));
        assert_eq!(expand_tilde(Path::new("~")).unwrap(), home);
    }

    #[test]
    fn explicit_config_wins() {
        let p = Path::new("/etc/np.yaml");
        assert_eq!(config_path(Some(p)).unwrap(), p);
    }
}
