pub mod config;
pub mod find;
pub mod roll;
pub mod schedule;
pub mod today;

use anyhow::Context;
use newspaper_core::config::Config;
use newspaper_core::paths;
use newspaper_core::timeline::Moment;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Load the config. An explicitly named file must exist; the default file
/// falls back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    let path = paths::config_path(explicit).context("failed to locate config")?;
    let config = if explicit.is_some() {
        Config::load(&path)
    } else {
        Config::load_or_default(&path)
    };
    config.with_context(|| format!("failed to load config from {}", path.display()))
}

#[derive(Serialize)]
struct NoteOutput {
    date: String,
    path: PathBuf,
    exists: bool,
    created: bool,
}

/// Print a note's path, creating the note first when `force` is set.
pub fn print_note(moment: &Moment, force: bool, json: bool) -> anyhow::Result<()> {
    let created = if force {
        moment
            .open_or_create()
            .with_context(|| format!("failed to create {}", moment.path().display()))?
    } else {
        false
    };
    if created {
        tracing::info!(path = %moment.path().display(), "created note");
    }

    if json {
        crate::output::print_json(&NoteOutput {
            date: moment.date().to_string(),
            path: moment.path(),
            exists: moment.exists(),
            created,
        })
    } else {
        println!("{}", moment.path().display());
        Ok(())
    }
}
