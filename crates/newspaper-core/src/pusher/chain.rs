use super::{exhausted, CountedDelay, Every, Push, Pusher, StepResult};
use crate::codec::{self, Opcode};
use crate::error::{NewspaperError, Result};
use std::collections::VecDeque;
use std::fmt;

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Strict sequence: only the head advances, and members are dropped from the
/// front as they exhaust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    members: VecDeque<Pusher>,
}

impl Chain {
    pub fn new(members: Vec<Pusher>) -> Result<Self> {
        if members.is_empty() {
            return Err(NewspaperError::EmptyCombinator { kind: "chain" });
        }
        Ok(Self::from_members(members))
    }

    /// A delay of `after` ticks followed by an every of `cycle`.
    pub fn delayed_every(after: u64, cycle: u64) -> Result<Self> {
        Self::new(vec![
            CountedDelay::new(after)?.into(),
            Every::new(cycle)?.into(),
        ])
    }

    pub(crate) fn from_members(members: Vec<Pusher>) -> Self {
        Self {
            members: members.into(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = &Pusher> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl Push for Chain {
    fn kind(&self) -> &'static str {
        "chain"
    }

    // Ticks left over after the head exhausts are not carried into the next
    // member; the caller sees `consumed` and advances again.
    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        if self.members.is_empty() {
            exhausted(self.kind());
        }
        let (consumed, result) = self.members[0].advance_many(ticks);
        if !result.is_exhausted() {
            return (consumed, result);
        }
        self.members.pop_front();
        if self.members.is_empty() {
            (consumed, StepResult::FiredAndExhausted)
        } else {
            (consumed, StepResult::Fired)
        }
    }

    fn ttl(&self) -> u64 {
        self.members.front().map_or(0, |head| head.ttl())
    }

    fn is_exhausted(&self) -> bool {
        self.members.is_empty()
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        write_sequence(self.kind(), Opcode::Chain, self.members.iter(), buf)
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_members(f, "chain", self.members.iter())
    }
}

// ---------------------------------------------------------------------------
// AndChain
// ---------------------------------------------------------------------------

/// Parallel conjunction: every live member advances on every tick, and the
/// chain fires on every tick it still has live members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AndChain {
    members: Vec<Pusher>,
}

impl AndChain {
    pub fn new(members: Vec<Pusher>) -> Result<Self> {
        if members.is_empty() {
            return Err(NewspaperError::EmptyCombinator { kind: "and-chain" });
        }
        Ok(Self::from_members(members))
    }

    pub(crate) fn from_members(members: Vec<Pusher>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Pusher] {
        &self.members
    }
}

impl Push for AndChain {
    fn kind(&self) -> &'static str {
        "and-chain"
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        if self.members.is_empty() {
            exhausted(self.kind());
        }
        if ticks == 0 {
            return (0, StepResult::Idle);
        }
        let step = ticks.min(self.ttl());
        advance_members(&mut self.members, step);
        if self.members.is_empty() {
            (step, StepResult::FiredAndExhausted)
        } else {
            (step, StepResult::Fired)
        }
    }

    fn ttl(&self) -> u64 {
        if self.members.is_empty() {
            0
        } else {
            1
        }
    }

    fn is_exhausted(&self) -> bool {
        self.members.is_empty()
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        write_sequence(self.kind(), Opcode::AndChain, self.members.iter(), buf)
    }
}

impl fmt::Display for AndChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_members(f, "and", self.members.iter())
    }
}

// ---------------------------------------------------------------------------
// OrChain
// ---------------------------------------------------------------------------

/// Parallel disjunction: every live member advances on every tick, and the
/// chain fires when any member fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrChain {
    members: Vec<Pusher>,
}

impl OrChain {
    pub fn new(members: Vec<Pusher>) -> Result<Self> {
        if members.is_empty() {
            return Err(NewspaperError::EmptyCombinator { kind: "or-chain" });
        }
        Ok(Self::from_members(members))
    }

    pub(crate) fn from_members(members: Vec<Pusher>) -> Self {
        Self { members }
    }

    pub fn members(&self) -> &[Pusher] {
        &self.members
    }
}

impl Push for OrChain {
    fn kind(&self) -> &'static str {
        "or-chain"
    }

    // Steps at most up to the nearest member event, so every member consumes
    // the same number of ticks.
    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        if self.members.is_empty() {
            exhausted(self.kind());
        }
        if ticks == 0 {
            return (0, StepResult::Idle);
        }
        let step = ticks.min(self.ttl());
        let any_fired = advance_members(&mut self.members, step);
        let result = if self.members.is_empty() {
            StepResult::FiredAndExhausted
        } else if any_fired {
            StepResult::Fired
        } else {
            StepResult::Idle
        };
        (step, result)
    }

    fn ttl(&self) -> u64 {
        self.members.iter().map(Push::ttl).min().unwrap_or(0)
    }

    fn is_exhausted(&self) -> bool {
        self.members.is_empty()
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        write_sequence(self.kind(), Opcode::OrChain, self.members.iter(), buf)
    }
}

impl fmt::Display for OrChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_members(f, "or", self.members.iter())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Advance every member by `step` ticks, then keep only members that did not
/// exhaust, keeping their order. Returns whether any member fired.
fn advance_members(members: &mut Vec<Pusher>, step: u64) -> bool {
    let results: Vec<StepResult> = members
        .iter_mut()
        .map(|m| m.advance_many(step).1)
        .collect();
    let any_fired = results.iter().any(|r| r.fired());

    *members = std::mem::take(members)
        .into_iter()
        .zip(results)
        .filter(|(_, result)| !result.is_exhausted())
        .map(|(member, _)| member)
        .collect();
    any_fired
}

fn write_sequence<'a>(
    kind: &'static str,
    opener: Opcode,
    members: impl ExactSizeIterator<Item = &'a Pusher>,
    buf: &mut Vec<u8>,
) -> Result<()> {
    if members.len() == 0 {
        return Err(NewspaperError::EncodeExhausted { kind });
    }
    codec::put_op(buf, opener);
    for member in members {
        member.write_encoding(buf)?;
    }
    codec::put_op(buf, Opcode::EndOfSequence);
    Ok(())
}

fn write_members<'a>(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    members: impl Iterator<Item = &'a Pusher>,
) -> fmt::Result {
    write!(f, "{name}(")?;
    for (i, member) in members.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{member}")?;
    }
    f.write_str(")")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pusher::{CountedRepeat, Once};

    fn delay(n: u64) -> Pusher {
        CountedDelay::new(n).unwrap().into()
    }

    #[test]
    fn chain_advances_head_only() {
        let mut chain = Chain::new(vec![delay(2), delay(1)]).unwrap();
        assert_eq!(chain.advance(), StepResult::Idle);
        assert_eq!(chain.advance(), StepResult::Fired);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain.advance(), StepResult::FiredAndExhausted);
        assert!(chain.is_exhausted());
    }

    #[test]
    fn chain_does_not_carry_leftover_ticks() {
        let mut chain = Chain::new(vec![delay(2), delay(5)]).unwrap();
        assert_eq!(chain.advance_many(10), (2, StepResult::Fired));
        assert_eq!(chain.ttl(), 5);
        assert_eq!(chain.advance_many(10), (5, StepResult::FiredAndExhausted));
    }

    #[test]
    fn delayed_every_starts_after_offset() {
        let mut chain = Chain::delayed_every(2, 3).unwrap();
        let fires: Vec<u64> = (1..=11).filter(|_| chain.advance().fired()).collect();
        assert_eq!(fires, vec![2, 5, 8, 11]);
        assert_eq!(chain.to_string(), "chain(every(3))");
    }

    #[test]
    fn delayed_every_rejects_zero_offset() {
        assert!(Chain::delayed_every(0, 3).is_err());
        assert!(Chain::delayed_every(3, 0).is_err());
    }

    #[test]
    fn empty_combinators_are_rejected() {
        assert!(matches!(
            Chain::new(Vec::new()),
            Err(NewspaperError::EmptyCombinator { kind: "chain" })
        ));
        assert!(AndChain::new(Vec::new()).is_err());
        assert!(OrChain::new(Vec::new()).is_err());
    }

    #[test]
    fn and_chain_drops_exhausted_members() {
        let mut and = AndChain::new(vec![delay(1), delay(2)]).unwrap();
        assert_eq!(and.advance(), StepResult::Fired);
        assert_eq!(and.members().len(), 1);
        assert_eq!(and.advance(), StepResult::FiredAndExhausted);
    }

    #[test]
    fn and_chain_pruning_keeps_order() {
        let mut and = AndChain::new(vec![delay(3), delay(1), delay(4), delay(1)]).unwrap();
        and.advance();
        let remaining: Vec<String> = and.members().iter().map(|m| m.to_string()).collect();
        assert_eq!(remaining, vec!["after(2)", "after(3)"]);
    }

    #[test]
    fn and_chain_advance_many_steps_one_tick() {
        let mut and = AndChain::new(vec![delay(5), delay(5)]).unwrap();
        assert_eq!(and.advance_many(4), (1, StepResult::Fired));
        assert_eq!(and.members()[0].ttl(), 4);
    }

    #[test]
    fn or_chain_fires_when_any_member_fires() {
        let mut or = OrChain::new(vec![
            Every::new(2).unwrap().into(),
            Every::new(3).unwrap().into(),
        ])
        .unwrap();
        let results: Vec<StepResult> = (0..6).map(|_| or.advance()).collect();
        assert_eq!(
            results,
            vec![
                StepResult::Idle,
                StepResult::Fired,
                StepResult::Fired,
                StepResult::Fired,
                StepResult::Idle,
                StepResult::Fired,
            ]
        );
    }

    #[test]
    fn or_chain_exhausts_when_empty() {
        let mut or = OrChain::new(vec![delay(2), Once::new().into()]).unwrap();
        assert_eq!(or.advance(), StepResult::Fired);
        assert_eq!(or.members().len(), 1);
        assert_eq!(or.advance(), StepResult::FiredAndExhausted);
    }

    #[test]
    fn or_chain_advance_many_stops_at_nearest_event() {
        let mut or = OrChain::new(vec![delay(7), delay(3)]).unwrap();
        assert_eq!(or.advance_many(100), (3, StepResult::Fired));
        assert_eq!(or.members().len(), 1);
        assert_eq!(or.ttl(), 4);
        assert_eq!(or.advance_many(2), (2, StepResult::Idle));
        assert_eq!(or.advance_many(2), (2, StepResult::FiredAndExhausted));
    }

    #[test]
    fn or_chain_advance_many_matches_stepping() {
        let build = || {
            OrChain::new(vec![
                delay(4),
                Every::new(3).unwrap().into(),
                CountedRepeat::new(2).unwrap().into(),
            ])
            .unwrap()
        };
        let mut stepped = build();
        let mut jumped = build();
        for _ in 0..20 {
            let (consumed, result) = jumped.advance_many(50);
            let mut last = StepResult::Idle;
            for _ in 0..consumed {
                last = stepped.advance();
            }
            assert_eq!(result, last);
            assert_eq!(jumped, stepped);
        }
    }

    #[test]
    fn sequences_encode_with_opener_and_terminator() {
        let chain = Chain::new(vec![Once::new().into(), delay(2)]).unwrap();
        assert_eq!(
            chain.encode().unwrap(),
            vec![
                Opcode::Chain as u8,
                Opcode::Once as u8,
                Opcode::CountedDelay as u8,
                2,
                Opcode::EndOfSequence as u8,
            ]
        );
    }

    #[test]
    fn dropped_members_are_not_encoded() {
        let mut chain = Chain::new(vec![Once::new().into(), delay(2)]).unwrap();
        chain.advance();
        assert_eq!(
            chain.encode().unwrap(),
            vec![
                Opcode::Chain as u8,
                Opcode::CountedDelay as u8,
                2,
                Opcode::EndOfSequence as u8,
            ]
        );
    }

    #[test]
    fn exhausted_chain_refuses_to_encode() {
        let mut chain = Chain::new(vec![Once::new().into()]).unwrap();
        assert_eq!(chain.advance(), StepResult::FiredAndExhausted);
        assert!(matches!(
            chain.encode(),
            Err(NewspaperError::EncodeExhausted { kind: "chain" })
        ));
    }

    #[test]
    #[should_panic(expected = "and-chain advanced after reporting exhaustion")]
    fn advancing_empty_and_chain_panics() {
        let mut and = AndChain::new(vec![Once::new().into()]).unwrap();
        and.advance();
        and.advance();
    }
}
