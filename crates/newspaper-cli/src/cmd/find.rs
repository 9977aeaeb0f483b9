use super::{load_config, print_note};
use anyhow::Context;
use newspaper_core::timeline::Moment;
use std::path::Path;

pub fn run(
    config: Option<&Path>,
    date: Option<&str>,
    offset: i64,
    force: bool,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let base = match date {
        Some(text) => Moment::parse(&config, text)?,
        None => Moment::today(&config)?,
    };
    let moment = base
        .next(offset)
        .with_context(|| format!("cannot move {offset} days from {}", base.date()))?;
    print_note(&moment, force, json)
}
