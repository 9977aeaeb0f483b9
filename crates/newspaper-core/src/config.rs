use crate::error::{NewspaperError, Result};
use crate::paths;
use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Where daily notes live and how their paths are laid out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_file_extension")]
    pub file_extension: String,
    /// Put surfaced reminders above carried schedules when rolling.
    #[serde(default)]
    pub reminders_first: bool,
    #[serde(default = "default_year_format")]
    pub year_format: String,
    #[serde(default = "default_month_format")]
    pub month_format: String,
    #[serde(default = "default_day_format")]
    pub day_format: String,
}

fn default_root() -> PathBuf {
    PathBuf::from(paths::DEFAULT_ROOT)
}

fn default_file_extension() -> String {
    "md".to_string()
}

fn default_year_format() -> String {
    "%Y".to_string()
}

fn default_month_format() -> String {
    "%m".to_string()
}

fn default_day_format() -> String {
    "%d".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root: default_root(),
            file_extension: default_file_extension(),
            reminders_first: false,
            year_format: default_year_format(),
            month_format: default_month_format(),
            day_format: default_day_format(),
        }
    }
}

impl Config {
    /// Year, month and day formats joined as path components.
    pub fn time_format(&self) -> String {
        format!(
            "{}/{}/{}",
            self.year_format, self.month_format, self.day_format
        )
    }

    /// [`Config::time_format`] plus the note extension.
    pub fn file_format(&self) -> String {
        format!("{}.{}", self.time_format(), self.file_extension)
    }

    /// Notes root with `~` expanded.
    pub fn root_dir(&self) -> Result<PathBuf> {
        paths::expand_tilde(&self.root)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(NewspaperError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Like [`Config::load`], but a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(NewspaperError::ConfigNotFound(_)) => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();
        let (Some(first), Some(second)) = (
            NaiveDate::from_ymd_opt(2024, 3, 1),
            NaiveDate::from_ymd_opt(2024, 3, 2),
        ) else {
            return warnings;
        };

        for (field, format) in [
            ("year_format", &self.year_format),
            ("month_format", &self.month_format),
            ("day_format", &self.day_format),
        ] {
            if format.trim().is_empty() {
                warnings.push(error(format!("{field} is empty")));
            } else if !is_valid_strftime(format) {
                warnings.push(error(format!("{field} '{format}' is not a valid date format")));
            } else if render(first, format).is_none() {
                warnings.push(error(format!(
                    "{field} '{format}' cannot be rendered for a date"
                )));
            } else if format.contains('/') {
                warnings.push(warning(format!(
                    "{field} '{format}' contains '/', adding extra directory levels"
                )));
            }
        }

        // The day format must tell two days of the same month apart, or every
        // day of the month maps to one note.
        if let (Some(a), Some(b)) = (
            render(first, &self.day_format),
            render(second, &self.day_format),
        ) {
            if a == b {
                warnings.push(error(format!(
                    "day_format '{}' has no day-of-month field",
                    self.day_format
                )));
            }
        }

        let ext = self.file_extension.trim();
        if ext.is_empty() {
            warnings.push(error("file_extension is empty".to_string()));
        } else if ext.starts_with('.') || ext.contains('/') {
            warnings.push(warning(format!(
                "file_extension '{}' should be a bare extension such as 'md'",
                self.file_extension
            )));
        }

        if self.root.as_os_str().is_empty() {
            warnings.push(error("root is empty".to_string()));
        }

        warnings
    }
}

fn error(message: String) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Error,
        message,
    }
}

fn warning(message: String) -> ConfigWarning {
    ConfigWarning {
        level: WarnLevel::Warning,
        message,
    }
}

fn is_valid_strftime(format: &str) -> bool {
    !StrftimeItems::new(format).any(|item| matches!(item, Item::Error))
}

/// Format `date`, or `None` when the format needs fields a date lacks.
pub(crate) fn render(date: NaiveDate, format: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", date.format(format)).ok()?;
    Some(out)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_fill_missing_fields() {
        let cfg: Config = serde_yaml::from_str("root: /srv/notes\nreminders_first: true\n").unwrap();
        assert_eq!(cfg.root, PathBuf::from("/srv/notes"));
        assert!(cfg.reminders_first);
        assert_eq!(cfg.file_format(), "%Y/%m/%d.md");
    }

    #[test]
    fn json_is_accepted() {
        let cfg: Config =
            serde_yaml::from_str(r#"{"root": "/tmp/np", "file_extension": "txt"}"#).unwrap();
        assert_eq!(cfg.file_format(), "%Y/%m/%d.txt");
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("newspaper.yaml");
        assert!(matches!(
            Config::load(&path),
            Err(NewspaperError::ConfigNotFound(_))
        ));
        assert_eq!(Config::load_or_default(&path).unwrap(), Config::default());
    }

    #[test]
    fn save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cfg/newspaper.yaml");
        let cfg = Config {
            root: dir.path().join("notes"),
            day_format: "%d-%a".to_string(),
            ..Config::default()
        };
        cfg.save(&path).unwrap();
        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("newspaper.yaml");
        std::fs::write(&path, "reminders_first: [not, a, bool]\n").unwrap();
        assert!(matches!(
            Config::load_or_default(&path),
            Err(NewspaperError::Yaml(_))
        ));
    }

    #[test]
    fn default_config_validates_clean() {
        assert!(Config::default().validate().is_empty());
    }

    #[test]
    fn validate_flags_formats() {
        let cfg = Config {
            month_format: String::new(),
            day_format: "%m".to_string(),
            file_extension: ".md".to_string(),
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("month_format is empty")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Error && w.message.contains("no day-of-month")));
        assert!(warnings
            .iter()
            .any(|w| w.level == WarnLevel::Warning && w.message.contains("file_extension")));
    }

    #[test]
    fn validate_flags_time_fields() {
        let cfg = Config {
            day_format: "%d-%H".to_string(),
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].level, WarnLevel::Error);
        assert!(warnings[0].message.contains("cannot be rendered for a date"));
    }

    #[test]
    fn validate_rejects_bad_strftime() {
        let cfg = Config {
            year_format: "%Q".to_string(),
            ..Config::default()
        };
        let warnings = cfg.validate();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("not a valid date format"));
    }
}
