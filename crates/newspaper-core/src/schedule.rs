use crate::codec;
use crate::error::{NewspaperError, Result};
use crate::pusher::{Push, Pusher, StepResult, Template};
use chrono::NaiveDate;
use std::fmt;
use std::io::Write;

// ---------------------------------------------------------------------------
// Element / Action
// ---------------------------------------------------------------------------

/// A piece of note text a schedule is attached to.
pub trait Element {
    fn text(&self) -> &str;

    /// Whether the element is marked done. Elements without a done state
    /// report `false`.
    fn completed(&self) -> bool {
        false
    }
}

/// Details of the tick that triggered an action.
#[derive(Debug, Clone, Copy)]
pub struct ActionContext {
    pub date: NaiveDate,
    pub outcome: StepResult,
}

/// What runs when a schedule fires.
pub trait Action: fmt::Debug {
    fn name(&self) -> &'static str;

    fn run(
        &self,
        ctx: &ActionContext,
        out: &mut dyn Write,
        parent: Option<&dyn Element>,
    ) -> Result<()>;
}

/// Writes the parent element back out as an open item.
#[derive(Debug, Clone, Copy, Default)]
pub struct Surface;

impl Action for Surface {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn run(
        &self,
        _ctx: &ActionContext,
        out: &mut dyn Write,
        parent: Option<&dyn Element>,
    ) -> Result<()> {
        let parent = parent.ok_or(NewspaperError::MissingElement(self.name()))?;
        let text = parent.text();
        let text = match text.strip_prefix("- [x] ").or_else(|| text.strip_prefix("- [X] ")) {
            Some(rest) if parent.completed() => format!("- [ ] {rest}"),
            _ => text.to_string(),
        };
        writeln!(out, "{text}")?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// A schedule tree paired with the fresh shape it started from and the
/// action it triggers.
#[derive(Debug)]
pub struct Schedule {
    origin: Template,
    state: Pusher,
    action: Box<dyn Action>,
    restarted: bool,
}

impl Schedule {
    pub fn new(fresh: Pusher, action: Box<dyn Action>) -> Self {
        Self {
            origin: Template::new(fresh.clone()),
            state: fresh,
            action,
            restarted: false,
        }
    }

    /// Rebuild a schedule from persisted bytes.
    ///
    /// A corrupt `state` falls back to a fresh start from `origin`; a corrupt
    /// `origin` is an error.
    pub fn resume(state: &[u8], origin: &[u8], action: Box<dyn Action>) -> Result<Self> {
        let origin = Template::new(codec::decode(origin)?);
        let (state, restarted) = match codec::decode(state) {
            Ok(state) => (state, false),
            Err(e) => {
                tracing::warn!(error = %e, "schedule state unreadable, restarting from origin");
                (origin.instantiate(), true)
            }
        };
        Ok(Self {
            origin,
            state,
            action,
            restarted,
        })
    }

    pub fn evaluated(&self) -> &dyn Action {
        self.action.as_ref()
    }

    /// Ticks until the next fire, or `None` once exhausted.
    pub fn ttl(&self) -> Option<u64> {
        if self.state.is_exhausted() {
            None
        } else {
            Some(self.state.ttl())
        }
    }

    pub fn describe(&self) -> String {
        self.state.to_string()
    }

    pub fn state(&self) -> &Pusher {
        &self.state
    }

    pub fn origin(&self) -> &Template {
        &self.origin
    }

    pub fn is_exhausted(&self) -> bool {
        self.state.is_exhausted()
    }

    /// Whether [`Schedule::resume`] discarded a corrupt state.
    pub fn restarted(&self) -> bool {
        self.restarted
    }

    /// Advance by `ticks`. Returns `FiredAndExhausted` if the tree ran out,
    /// `Fired` if it fired at least once, `Idle` otherwise.
    pub fn advance(&mut self, ticks: u64) -> Result<StepResult> {
        if self.state.is_exhausted() {
            return Err(NewspaperError::ScheduleExhausted);
        }
        let mut outcome = StepResult::Idle;
        let mut left = ticks;
        while left > 0 {
            let (consumed, result) = self.state.advance_many(left);
            debug_assert!(consumed > 0, "{} consumed no ticks", self.state.kind());
            left = left.saturating_sub(consumed.max(1));
            match result {
                StepResult::FiredAndExhausted => return Ok(result),
                StepResult::Fired => outcome = StepResult::Fired,
                StepResult::Idle => {}
            }
        }
        Ok(outcome)
    }

    pub fn encode_state(&self) -> Result<Vec<u8>> {
        self.state.encode()
    }

    pub fn encode_origin(&self) -> Result<Vec<u8>> {
        self.origin.shape().encode()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pusher::{Chain, CountedDelay, Every, Once, Repeat};

    struct Line(&'static str, bool);

    impl Element for Line {
        fn text(&self) -> &str {
            self.0
        }
        fn completed(&self) -> bool {
            self.1
        }
    }

    fn ctx() -> ActionContext {
        ActionContext {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            outcome: StepResult::Fired,
        }
    }

    fn every(n: u64) -> Pusher {
        Every::new(n).unwrap().into()
    }

    #[test]
    fn advance_aggregates_over_many_ticks() {
        let mut schedule = Schedule::new(every(3), Box::new(Surface));
        assert_eq!(schedule.advance(2).unwrap(), StepResult::Idle);
        assert_eq!(schedule.ttl(), Some(1));
        assert_eq!(schedule.advance(7).unwrap(), StepResult::Fired);
        assert_eq!(schedule.ttl(), Some(3));
        assert_eq!(schedule.advance(0).unwrap(), StepResult::Idle);
    }

    #[test]
    fn advance_crosses_chain_members() {
        let chain = Chain::new(vec![
            CountedDelay::new(2).unwrap().into(),
            CountedDelay::new(3).unwrap().into(),
        ])
        .unwrap();
        let mut schedule = Schedule::new(chain.into(), Box::new(Surface));
        assert_eq!(schedule.advance(5).unwrap(), StepResult::FiredAndExhausted);
        assert!(schedule.is_exhausted());
        assert_eq!(schedule.ttl(), None);
    }

    #[test]
    fn advancing_exhausted_schedule_is_an_error() {
        let mut schedule = Schedule::new(Once::new().into(), Box::new(Surface));
        assert!(schedule.advance(1).unwrap().is_exhausted());
        assert!(matches!(
            schedule.advance(1),
            Err(NewspaperError::ScheduleExhausted)
        ));
        assert!(schedule.encode_state().is_err());
        assert!(schedule.encode_origin().is_ok());
    }

    #[test]
    fn resume_restores_progress() {
        let template = Template::new(CountedDelay::new(4).unwrap());
        let mut schedule = Schedule::new(Repeat::new(2, template).unwrap().into(), Box::new(Surface));
        schedule.advance(5).unwrap();

        let state = schedule.encode_state().unwrap();
        let origin = schedule.encode_origin().unwrap();
        let resumed = Schedule::resume(&state, &origin, Box::new(Surface)).unwrap();
        assert!(!resumed.restarted());
        assert_eq!(resumed.ttl(), Some(3));
        assert_eq!(resumed.describe(), schedule.describe());
    }

    #[test]
    fn resume_falls_back_to_origin_on_corrupt_state() {
        let origin = Every::new(5).unwrap().encode().unwrap();
        let resumed = Schedule::resume(&[0xFF, 0x01], &origin, Box::new(Surface)).unwrap();
        assert!(resumed.restarted());
        assert_eq!(resumed.ttl(), Some(5));
    }

    #[test]
    fn resume_rejects_corrupt_origin() {
        let state = Every::new(5).unwrap().encode().unwrap();
        assert!(matches!(
            Schedule::resume(&state, &[], Box::new(Surface)),
            Err(NewspaperError::Decode { .. })
        ));
    }

    #[test]
    fn surface_reopens_completed_items() {
        let mut out = Vec::new();
        Surface
            .run(&ctx(), &mut out, Some(&Line("- [x] water plants", true) as &dyn Element))
            .unwrap();
        Surface
            .run(&ctx(), &mut out, Some(&Line("plain note", false) as &dyn Element))
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "- [ ] water plants\nplain note\n"
        );
    }

    #[test]
    fn surface_needs_parent() {
        let mut out = Vec::new();
        assert!(matches!(
            Surface.run(&ctx(), &mut out, None),
            Err(NewspaperError::MissingElement("surface"))
        ));
    }

    #[test]
    fn evaluated_exposes_action() {
        let schedule = Schedule::new(every(1), Box::new(Surface));
        assert_eq!(schedule.evaluated().name(), "surface");
        assert_eq!(schedule.describe(), "every(1)");
    }
}
