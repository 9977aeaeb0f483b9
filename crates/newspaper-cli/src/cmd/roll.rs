use super::load_config;
use crate::output::{print_json, print_table};
use anyhow::Context;
use newspaper_core::config::Config;
use newspaper_core::roll;
use newspaper_core::timeline::Moment;
use std::path::Path;

pub fn run(
    config: Option<&Path>,
    from: Option<&str>,
    to: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let to = match to {
        Some(text) => Moment::parse(&config, text)?,
        None => Moment::today(&config)?,
    };
    let from = match from {
        Some(text) => Moment::parse(&config, text)?,
        None => to.next(-1)?,
    };

    let report = roll::roll(&config, &from, &to)
        .with_context(|| format!("failed to roll {} into {}", from.date(), to.date()))?;

    if json {
        return print_json(&report);
    }

    if !report.entries.is_empty() {
        let rows = report
            .entries
            .iter()
            .map(|e| {
                vec![
                    e.line.to_string(),
                    e.outcome.to_string(),
                    e.next.clone().unwrap_or_else(|| "-".to_string()),
                    e.text.clone(),
                ]
            })
            .collect();
        print_table(&["LINE", "OUTCOME", "NEXT", "TEXT"], rows);
    }
    println!(
        "Rolled {} line(s) over {} day(s): {} fired, {} carried.",
        report.entries.len(),
        report.days,
        report.fired(),
        report.carried()
    );
    if report.already_rolled() > 0 {
        println!(
            "{} line(s) were already in the target and were not written again.",
            report.already_rolled()
        );
    }
    if report.skipped > 0 {
        println!("Skipped {} unreadable line(s).", report.skipped);
    }
    println!("{}", describe_target(&config, &to));
    Ok(())
}

fn describe_target(config: &Config, to: &Moment) -> String {
    let root = config.root_dir().unwrap_or_else(|_| config.root.clone());
    match to.path().strip_prefix(&root) {
        Ok(rel) => format!("Wrote {} (under {})", rel.display(), root.display()),
        Err(_) => format!("Wrote {}", to.path().display()),
    }
}
