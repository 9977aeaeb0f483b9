use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use newspaper_core::note::{self, Token};
use newspaper_core::pusher::{Shape, StepResult};
use newspaper_core::schedule::{Schedule, Surface};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ScheduleSubcommand {
    /// Build a schedule token from a YAML or JSON shape
    New {
        /// Shape, e.g. '{kind: repeat, times: 3, of: {kind: every, ticks: 7}}'
        shape: String,
        /// Note text to attach the token to
        #[arg(long, allow_hyphen_values = true)]
        text: Option<String>,
    },

    /// Describe the schedule held by a token
    Show {
        /// Token, either '{np:STATE:ORIGIN}' or 'STATE:ORIGIN'
        token: String,
    },

    /// Advance a token by a number of ticks and print the result
    Advance {
        token: String,
        /// Ticks (days) to advance
        #[arg(long, default_value_t = 1)]
        ticks: u64,
    },
}

#[derive(Serialize)]
struct ScheduleOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<String>,
    state: String,
    origin: String,
    ttl: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<StepResult>,
    restarted: bool,
}

impl ScheduleOutput {
    fn of(schedule: &Schedule) -> anyhow::Result<Self> {
        let token = if schedule.is_exhausted() {
            None
        } else {
            Some(Token::for_schedule(schedule)?.to_string())
        };
        Ok(Self {
            token,
            line: None,
            state: schedule.describe(),
            origin: schedule.origin().to_string(),
            ttl: schedule.ttl(),
            outcome: None,
            restarted: schedule.restarted(),
        })
    }

    fn print(&self) {
        if let Some(outcome) = self.outcome {
            println!("outcome:  {outcome}");
        }
        println!("state:    {}", self.state);
        println!("origin:   {}", self.origin);
        match self.ttl {
            Some(ttl) => println!("next:     in {ttl} tick(s)"),
            None => println!("next:     finished"),
        }
        if self.restarted {
            println!("note:     state was unreadable, restarted from origin");
        }
        if let Some(line) = self.line.as_ref().or(self.token.as_ref()) {
            println!("{line}");
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(subcmd: ScheduleSubcommand, json: bool) -> anyhow::Result<()> {
    let output = match subcmd {
        ScheduleSubcommand::New { shape, text } => new(&shape, text.as_deref())?,
        ScheduleSubcommand::Show { token } => show(&token)?,
        ScheduleSubcommand::Advance { token, ticks } => advance(&token, ticks)?,
    };
    if json {
        print_json(&output)
    } else {
        output.print();
        Ok(())
    }
}

fn new(shape: &str, text: Option<&str>) -> anyhow::Result<ScheduleOutput> {
    let shape: Shape = serde_yaml::from_str(shape).context("failed to parse shape")?;
    let pusher = shape.build().context("invalid shape")?;
    let schedule = Schedule::new(pusher, Box::new(Surface));
    let mut output = ScheduleOutput::of(&schedule)?;
    if let Some(text) = text {
        output.line = Some(note::render_line(text, &schedule)?);
    }
    Ok(output)
}

fn resume(token: &str) -> anyhow::Result<Schedule> {
    let token = Token::parse(token)?;
    token
        .resume(Box::new(Surface))
        .context("failed to resume schedule")
}

fn show(token: &str) -> anyhow::Result<ScheduleOutput> {
    ScheduleOutput::of(&resume(token)?)
}

fn advance(token: &str, ticks: u64) -> anyhow::Result<ScheduleOutput> {
    let mut schedule = resume(token)?;
    let outcome = schedule.advance(ticks)?;
    tracing::debug!(ticks, %outcome, "advanced schedule");
    let mut output = ScheduleOutput::of(&schedule)?;
    output.outcome = Some(outcome);
    Ok(output)
}
