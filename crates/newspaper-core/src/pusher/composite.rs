use super::{require_ticks, CountedDelay, Push, Pusher, StepResult, Template};
use crate::codec::{self, Opcode};
use crate::error::{NewspaperError, Result};
use std::fmt;

// ---------------------------------------------------------------------------
// Every
// ---------------------------------------------------------------------------

/// Fires every `cycle` ticks, forever.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Every {
    pending: CountedDelay,
    cycle: u64,
}

impl Every {
    pub fn new(cycle: u64) -> Result<Self> {
        let cycle = require_ticks("every", cycle)?;
        Ok(Self::resume(CountedDelay::with_remaining(cycle), cycle))
    }

    /// `pending` must hold between 1 and `cycle` ticks.
    pub(crate) fn resume(pending: CountedDelay, cycle: u64) -> Self {
        Self { pending, cycle }
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn pending(&self) -> &CountedDelay {
        &self.pending
    }

    fn settle(&mut self, result: StepResult) -> StepResult {
        if !result.is_exhausted() {
            return result;
        }
        self.pending = CountedDelay::with_remaining(self.cycle);
        StepResult::Fired
    }
}

impl Push for Every {
    fn kind(&self) -> &'static str {
        "every"
    }

    fn advance(&mut self) -> StepResult {
        let result = self.pending.advance();
        self.settle(result)
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        let (consumed, result) = self.pending.advance_many(ticks);
        (consumed, self.settle(result))
    }

    fn ttl(&self) -> u64 {
        self.pending.ttl()
    }

    fn is_exhausted(&self) -> bool {
        false
    }

    // The pending delay is always written, even when untouched, so a
    // delayed every (a delay chained before an every) never reads back as a
    // partially consumed one.
    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.pending.write_encoding(buf)?;
        codec::put_op(buf, Opcode::Every);
        codec::put_uvarint(buf, self.cycle);
        Ok(())
    }
}

impl fmt::Display for Every {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.pending.remaining() == self.cycle {
            write!(f, "every({})", self.cycle)
        } else {
            write!(f, "every({}, next={})", self.cycle, self.pending.remaining())
        }
    }
}

// ---------------------------------------------------------------------------
// Repeat
// ---------------------------------------------------------------------------

/// Runs `times` consecutive instances of a template, then is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repeat {
    live: Box<Pusher>,
    template: Template,
    /// Instances still to run after the live one.
    remaining: u64,
}

impl Repeat {
    pub fn new(times: u64, template: Template) -> Result<Self> {
        let times = require_ticks("repeat", times)?;
        let live = template.instantiate();
        Ok(Self::resume(live, times - 1, template))
    }

    pub(crate) fn resume(live: Pusher, remaining: u64, template: Template) -> Self {
        Self {
            live: Box::new(live),
            template,
            remaining,
        }
    }

    pub fn live(&self) -> &Pusher {
        &self.live
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    fn settle(&mut self, result: StepResult) -> StepResult {
        if !result.is_exhausted() || self.remaining == 0 {
            return result;
        }
        self.remaining -= 1;
        *self.live = self.template.instantiate();
        StepResult::Fired
    }
}

impl Push for Repeat {
    fn kind(&self) -> &'static str {
        "repeat"
    }

    fn advance(&mut self) -> StepResult {
        let result = self.live.advance();
        self.settle(result)
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        let (consumed, result) = self.live.advance_many(ticks);
        (consumed, self.settle(result))
    }

    fn ttl(&self) -> u64 {
        self.live.ttl()
    }

    fn is_exhausted(&self) -> bool {
        self.live.is_exhausted()
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        if self.is_exhausted() {
            return Err(NewspaperError::EncodeExhausted { kind: self.kind() });
        }
        self.live.write_encoding(buf)?;
        codec::put_op(buf, Opcode::Repeat);
        codec::put_uvarint(buf, self.remaining);
        write_template(self.kind(), &self.template, buf)?;
        codec::put_op(buf, Opcode::EndOfSequence);
        Ok(())
    }
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "repeat({} + {} x {})",
            self.live, self.remaining, self.template
        )
    }
}

// ---------------------------------------------------------------------------
// Forever
// ---------------------------------------------------------------------------

/// Runs instances of a template back to back with no bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forever {
    live: Box<Pusher>,
    template: Template,
}

impl Forever {
    pub fn new(template: Template) -> Self {
        let live = template.instantiate();
        Self::resume(live, template)
    }

    pub(crate) fn resume(live: Pusher, template: Template) -> Self {
        Self {
            live: Box::new(live),
            template,
        }
    }

    pub fn live(&self) -> &Pusher {
        &self.live
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    fn settle(&mut self, result: StepResult) -> StepResult {
        if !result.is_exhausted() {
            return result;
        }
        *self.live = self.template.instantiate();
        StepResult::Fired
    }
}

impl Push for Forever {
    fn kind(&self) -> &'static str {
        "forever"
    }

    fn advance(&mut self) -> StepResult {
        let result = self.live.advance();
        self.settle(result)
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        let (consumed, result) = self.live.advance_many(ticks);
        (consumed, self.settle(result))
    }

    fn ttl(&self) -> u64 {
        self.live.ttl()
    }

    fn is_exhausted(&self) -> bool {
        false
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.live.write_encoding(buf)?;
        codec::put_op(buf, Opcode::Forever);
        write_template(self.kind(), &self.template, buf)?;
        codec::put_op(buf, Opcode::EndOfSequence);
        Ok(())
    }
}

impl fmt::Display for Forever {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forever({} then {})", self.live, self.template)
    }
}

fn write_template(kind: &'static str, template: &Template, buf: &mut Vec<u8>) -> Result<()> {
    template
        .shape()
        .write_encoding(buf)
        .map_err(|e| NewspaperError::EncodeTemplate {
            kind,
            source: Box::new(e),
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pusher::{Chain, CountedRepeat, Once};

    fn fire_ticks(p: &mut impl Push, ticks: u64) -> Vec<u64> {
        (1..=ticks).filter(|_| p.advance().fired()).collect()
    }

    #[test]
    fn every_fires_on_multiples_of_cycle() {
        let mut every = Every::new(3).unwrap();
        assert_eq!(fire_ticks(&mut every, 12), vec![3, 6, 9, 12]);
        assert!(!every.is_exhausted());
    }

    #[test]
    fn every_never_exhausts() {
        let mut every = Every::new(1).unwrap();
        for _ in 0..500 {
            assert_eq!(every.advance(), StepResult::Fired);
        }
    }

    #[test]
    fn every_advance_many_stops_at_fire() {
        let mut every = Every::new(4).unwrap();
        assert_eq!(every.advance_many(2), (2, StepResult::Idle));
        assert_eq!(every.advance_many(10), (2, StepResult::Fired));
        assert_eq!(every.ttl(), 4);
    }

    #[test]
    fn repeat_fires_times_per_instance() {
        let template = Template::new(CountedRepeat::new(2).unwrap());
        let mut repeat = Repeat::new(3, template).unwrap();

        let results: Vec<StepResult> = (0..6).map(|_| repeat.advance()).collect();
        assert_eq!(results.iter().filter(|r| r.fired()).count(), 6);
        assert_eq!(results[5], StepResult::FiredAndExhausted);
        assert!(results[..5].iter().all(|r| *r == StepResult::Fired));
        assert!(repeat.is_exhausted());
    }

    #[test]
    fn repeat_masks_inner_exhaustion() {
        let template = Template::new(CountedDelay::new(2).unwrap());
        let mut repeat = Repeat::new(2, template).unwrap();
        assert_eq!(repeat.advance(), StepResult::Idle);
        assert_eq!(repeat.advance(), StepResult::Fired);
        assert_eq!(repeat.remaining(), 0);
        assert_eq!(repeat.advance(), StepResult::Idle);
        assert_eq!(repeat.advance(), StepResult::FiredAndExhausted);
    }

    #[test]
    fn repeat_once_is_its_template() {
        let template = Template::new(CountedDelay::new(3).unwrap());
        let mut repeat = Repeat::new(1, template).unwrap();
        assert_eq!(repeat.advance_many(3), (3, StepResult::FiredAndExhausted));
    }

    #[test]
    fn repeat_rejects_zero_times() {
        let template = Template::new(Once::new());
        assert!(matches!(
            Repeat::new(0, template),
            Err(NewspaperError::InvalidTicks { kind: "repeat", .. })
        ));
    }

    #[test]
    fn forever_regenerates_without_bound() {
        let template = Template::new(CountedDelay::new(2).unwrap());
        let mut forever = Forever::new(template);
        assert_eq!(fire_ticks(&mut forever, 10), vec![2, 4, 6, 8, 10]);
        assert!(!forever.is_exhausted());
    }

    #[test]
    fn forever_of_chain_restarts_whole_sequence() {
        let chain = Chain::new(vec![
            CountedDelay::new(2).unwrap().into(),
            CountedRepeat::new(2).unwrap().into(),
        ])
        .unwrap();
        let mut forever = Forever::new(Template::new(chain));
        assert_eq!(fire_ticks(&mut forever, 8), vec![2, 3, 4, 6, 7, 8]);
    }

    #[test]
    fn every_encodes_pending_delay() {
        let mut every = Every::new(5).unwrap();
        assert_eq!(
            every.encode().unwrap(),
            vec![
                Opcode::CountedDelay as u8,
                5,
                Opcode::Every as u8,
                5
            ]
        );
        every.advance_many(3);
        assert_eq!(every.encode().unwrap()[1], 2);
        assert_eq!(every.to_string(), "every(5, next=2)");
    }

    #[test]
    fn repeat_encodes_live_then_template() {
        let template = Template::new(CountedDelay::new(3).unwrap());
        let mut repeat = Repeat::new(2, template).unwrap();
        repeat.advance();
        assert_eq!(
            repeat.encode().unwrap(),
            vec![
                Opcode::CountedDelay as u8,
                2,
                Opcode::Repeat as u8,
                1,
                Opcode::CountedDelay as u8,
                3,
                Opcode::EndOfSequence as u8,
            ]
        );
        assert_eq!(repeat.to_string(), "repeat(after(2) + 1 x after(3))");
    }

    #[test]
    fn exhausted_repeat_refuses_to_encode() {
        let mut repeat = Repeat::new(1, Template::new(Once::new())).unwrap();
        repeat.advance();
        assert!(matches!(
            repeat.encode(),
            Err(NewspaperError::EncodeExhausted { kind: "repeat" })
        ));
    }

    #[test]
    fn spent_template_error_names_cause_once() {
        let mut spent = Once::new();
        spent.advance();
        let forever = Forever::resume(Once::new().into(), Template::new(spent));
        let err = forever.encode().unwrap_err();
        assert_eq!(err.to_string(), "cannot encode template of forever");
        let cause = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(cause.as_deref(), Some("cannot encode exhausted once"));
    }

    #[test]
    fn forever_encodes_template_once() {
        let mut forever = Forever::new(Template::new(CountedRepeat::new(3).unwrap()));
        forever.advance_many(100);
        forever.advance();
        assert_eq!(
            forever.encode().unwrap(),
            vec![
                Opcode::CountedRepeat as u8,
                2,
                Opcode::Forever as u8,
                Opcode::CountedRepeat as u8,
                3,
                Opcode::EndOfSequence as u8,
            ]
        );
    }
}
