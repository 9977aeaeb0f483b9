use super::{load_config, print_note};
use newspaper_core::timeline::Moment;
use std::path::Path;

pub fn run(config: Option<&Path>, force: bool, json: bool) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let moment = Moment::today(&config)?;
    print_note(&moment, force, json)
}
