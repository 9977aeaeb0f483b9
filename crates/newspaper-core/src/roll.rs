use crate::config::Config;
use crate::error::{NewspaperError, Result};
use crate::io;
use crate::note::{self, ScheduledLine};
use crate::pusher::StepResult;
use crate::schedule::{ActionContext, Element, Surface};
use crate::timeline::Moment;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize)]
pub struct RollEntry {
    pub line: usize,
    pub text: String,
    pub outcome: StepResult,
    /// Current schedule state, absent once it has finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    pub restarted: bool,
    /// The target already held this line's output, so nothing was written.
    pub already_rolled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RollReport {
    pub from: PathBuf,
    pub to: PathBuf,
    pub days: u64,
    pub entries: Vec<RollEntry>,
    /// Lines whose token could not be resumed.
    pub skipped: usize,
}

impl RollReport {
    pub fn fired(&self) -> usize {
        self.entries.iter().filter(|e| e.outcome.fired()).count()
    }

    pub fn carried(&self) -> usize {
        self.entries.iter().filter(|e| e.next.is_some()).count()
    }

    pub fn already_rolled(&self) -> usize {
        self.entries.iter().filter(|e| e.already_rolled).count()
    }
}

/// Carry the scheduled lines of `from` forward into `to`.
///
/// Every scheduled line advances by one tick per day between the two notes.
/// Lines that fire are surfaced into `to`; lines still live are re-encoded
/// and carried. Finished schedules are dropped. Output the target already
/// contains is not written again, so rolling the same pair twice leaves the
/// target unchanged.
pub fn roll(config: &Config, from: &Moment, to: &Moment) -> Result<RollReport> {
    let days = from.days_until(to);
    if days <= 0 {
        return Err(NewspaperError::InvalidRoll {
            from: from.date().to_string(),
            to: to.date().to_string(),
        });
    }
    let days = days.unsigned_abs();

    let source = from.path();
    let text = match std::fs::read_to_string(&source) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(NewspaperError::NoteNotFound(source))
        }
        Err(e) => return Err(e.into()),
    };

    let target = to.path();
    to.open_or_create()?;
    let existing = std::fs::read_to_string(&target)?;
    let present: HashSet<&str> = existing.lines().collect();

    let mut reminders = String::new();
    let mut carried = String::new();
    let mut entries = Vec::new();
    let mut skipped = 0;

    for scheduled in note::scan(&text) {
        match roll_line(&scheduled, to, days) {
            Ok(mut rolled) => {
                rolled.entry.already_rolled = rolled.lines().next().is_some()
                    && rolled.lines().all(|l| present.contains(l));
                if rolled.entry.already_rolled {
                    tracing::debug!(line = scheduled.line, "already rolled");
                } else {
                    reminders.push_str(&rolled.reminders);
                    carried.push_str(&rolled.carried);
                }
                entries.push(rolled.entry);
            }
            Err(e) => {
                tracing::warn!(line = scheduled.line, error = %e, "skipping scheduled line");
                skipped += 1;
            }
        }
    }

    let body = if config.reminders_first {
        format!("{reminders}{carried}")
    } else {
        format!("{carried}{reminders}")
    };
    if !body.is_empty() {
        io::append_text(&target, &body)?;
    }
    tracing::debug!(
        from = %source.display(),
        to = %target.display(),
        lines = entries.len(),
        "rolled note"
    );

    Ok(RollReport {
        from: source,
        to: target,
        days,
        entries,
        skipped,
    })
}

/// One scheduled line after advancing, with the text it contributes.
struct Rolled {
    entry: RollEntry,
    reminders: String,
    carried: String,
}

impl Rolled {
    fn lines(&self) -> impl Iterator<Item = &str> {
        self.reminders.lines().chain(self.carried.lines())
    }
}

fn roll_line(scheduled: &ScheduledLine, to: &Moment, days: u64) -> Result<Rolled> {
    let mut schedule = scheduled.token.resume(Box::new(Surface))?;
    let outcome = schedule.advance(days)?;

    let mut reminders: Vec<u8> = Vec::new();
    if outcome.fired() {
        let ctx = ActionContext {
            date: to.date(),
            outcome,
        };
        schedule
            .evaluated()
            .run(&ctx, &mut reminders, Some(&scheduled.element as &dyn Element))?;
    }

    let mut carried = String::new();
    let next = if outcome.is_exhausted() {
        None
    } else {
        carried.push_str(&note::render_line(scheduled.element.text(), &schedule)?);
        carried.push('\n');
        Some(schedule.describe())
    };

    Ok(Rolled {
        entry: RollEntry {
            line: scheduled.line,
            text: scheduled.element.text().to_string(),
            outcome,
            next,
            restarted: schedule.restarted(),
            already_rolled: false,
        },
        reminders: String::from_utf8_lossy(&reminders).into_owned(),
        carried,
    })
}
