mod cmd;
mod output;

use clap::{Parser, Subcommand};
use cmd::{config::ConfigSubcommand, schedule::ScheduleSubcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "np",
    about = "Daily notes with recurring reminders carried from day to day",
    version,
    propagate_version = true
)]
struct Cli {
    /// Config file (default: ~/.config/newspaper.yaml)
    #[arg(long, global = true, env = "NP_CONFIG")]
    config: Option<PathBuf>,

    /// Log with verbose output
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the path to today's note, optionally creating it
    Today {
        /// Create the note if it does not exist
        #[arg(short = 'f', long)]
        force: bool,
    },

    /// Print the path to a note relative to a date
    Find {
        /// Create the note if it does not exist
        #[arg(short = 'f', long)]
        force: bool,
        /// Date to start from, in the configured format or YYYY-MM-DD (default: today)
        #[arg(short = 'r', long = "root", value_name = "DATE")]
        date: Option<String>,
        /// Day offset from the date
        #[arg(short = 'o', long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
    },

    /// Create, inspect and advance schedule tokens
    Schedule {
        #[command(subcommand)]
        subcommand: ScheduleSubcommand,
    },

    /// Carry scheduled lines from one note into a later one
    Roll {
        /// Source note date (default: yesterday)
        #[arg(long, value_name = "DATE")]
        from: Option<String>,
        /// Target note date (default: today)
        #[arg(long, value_name = "DATE")]
        to: Option<String>,
    },

    /// Create, show or validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();

    let result = match cli.command {
        Commands::Today { force } => cmd::today::run(config, force, cli.json),
        Commands::Find {
            force,
            date,
            offset,
        } => cmd::find::run(config, date.as_deref(), offset, force, cli.json),
        Commands::Schedule { subcommand } => cmd::schedule::run(subcommand, cli.json),
        Commands::Roll { from, to } => {
            cmd::roll::run(config, from.as_deref(), to.as_deref(), cli.json)
        }
        Commands::Config { subcommand } => cmd::config::run(config, subcommand, cli.json),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
