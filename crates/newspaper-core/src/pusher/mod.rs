//! Tick-driven schedule nodes.
//!
//! A schedule is a tree of pushers. Each node is exclusively owned by its
//! parent and advances by whole ticks (days). Repetition never shares nodes:
//! composites keep a [`Template`] and regenerate a fresh child from it once
//! the live child is exhausted.

mod atom;
mod chain;
mod composite;
mod shape;

pub use atom::{CountedDelay, CountedRepeat, Once};
pub use chain::{AndChain, Chain, OrChain};
pub use composite::{Every, Forever, Repeat};
pub use shape::Shape;

use crate::error::{NewspaperError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// StepResult
// ---------------------------------------------------------------------------

/// Outcome of consuming one or more ticks.
///
/// A node never becomes exhausted without firing on that same tick, so
/// exhaustion only ever appears as `FiredAndExhausted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepResult {
    Idle,
    Fired,
    FiredAndExhausted,
}

impl StepResult {
    pub fn fired(self) -> bool {
        !matches!(self, StepResult::Idle)
    }

    pub fn is_exhausted(self) -> bool {
        matches!(self, StepResult::FiredAndExhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepResult::Idle => "idle",
            StepResult::Fired => "fired",
            StepResult::FiredAndExhausted => "fired_and_exhausted",
        }
    }
}

impl fmt::Display for StepResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Push
// ---------------------------------------------------------------------------

/// The operation set every schedule node supports.
///
/// # Panics
///
/// `advance` and `advance_many` panic when called on a node that already
/// reported [`StepResult::FiredAndExhausted`]. The parent is expected to drop
/// or regenerate a node the moment it exhausts.
pub trait Push {
    /// Short name of the node kind, used in errors and panics.
    fn kind(&self) -> &'static str;

    /// Consume exactly one tick.
    fn advance(&mut self) -> StepResult {
        self.advance_many(1).1
    }

    /// Consume up to `ticks` ticks, returning how many were consumed and the
    /// result of the last one. Stops early at the first tick that exhausts
    /// the node (or, for composites, the live child). `advance_many(0)`
    /// returns `(0, Idle)`.
    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult);

    /// Ticks until the next tick that fires. Zero once exhausted.
    fn ttl(&self) -> u64;

    fn is_exhausted(&self) -> bool;

    /// Append the encoding of the current state. May leave a partial write
    /// behind on error; callers use [`Push::append_encoding`].
    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()>;

    /// Append the encoding of the current state, leaving `buf` untouched on
    /// error.
    fn append_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        let mark = buf.len();
        if let Err(e) = self.write_encoding(buf) {
            buf.truncate(mark);
            return Err(e);
        }
        Ok(())
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_encoding(&mut buf)?;
        Ok(buf)
    }
}

#[track_caller]
pub(crate) fn exhausted(kind: &str) -> ! {
    panic!("{kind} advanced after reporting exhaustion");
}

pub(crate) fn require_ticks(kind: &'static str, value: u64) -> Result<u64> {
    if value == 0 {
        return Err(NewspaperError::InvalidTicks { kind, value });
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Pusher
// ---------------------------------------------------------------------------

/// Any schedule node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pusher {
    Once(Once),
    Delay(CountedDelay),
    Times(CountedRepeat),
    Every(Every),
    Repeat(Repeat),
    Forever(Forever),
    Chain(Chain),
    And(AndChain),
    Or(OrChain),
}

impl Pusher {
    fn node(&self) -> &dyn Push {
        match self {
            Pusher::Once(p) => p,
            Pusher::Delay(p) => p,
            Pusher::Times(p) => p,
            Pusher::Every(p) => p,
            Pusher::Repeat(p) => p,
            Pusher::Forever(p) => p,
            Pusher::Chain(p) => p,
            Pusher::And(p) => p,
            Pusher::Or(p) => p,
        }
    }

    fn node_mut(&mut self) -> &mut dyn Push {
        match self {
            Pusher::Once(p) => p,
            Pusher::Delay(p) => p,
            Pusher::Times(p) => p,
            Pusher::Every(p) => p,
            Pusher::Repeat(p) => p,
            Pusher::Forever(p) => p,
            Pusher::Chain(p) => p,
            Pusher::And(p) => p,
            Pusher::Or(p) => p,
        }
    }
}

impl Push for Pusher {
    fn kind(&self) -> &'static str {
        self.node().kind()
    }

    fn advance(&mut self) -> StepResult {
        self.node_mut().advance()
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        self.node_mut().advance_many(ticks)
    }

    fn ttl(&self) -> u64 {
        self.node().ttl()
    }

    fn is_exhausted(&self) -> bool {
        self.node().is_exhausted()
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        self.node().write_encoding(buf)
    }
}

impl fmt::Display for Pusher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pusher::Once(p) => fmt::Display::fmt(p, f),
            Pusher::Delay(p) => fmt::Display::fmt(p, f),
            Pusher::Times(p) => fmt::Display::fmt(p, f),
            Pusher::Every(p) => fmt::Display::fmt(p, f),
            Pusher::Repeat(p) => fmt::Display::fmt(p, f),
            Pusher::Forever(p) => fmt::Display::fmt(p, f),
            Pusher::Chain(p) => fmt::Display::fmt(p, f),
            Pusher::And(p) => fmt::Display::fmt(p, f),
            Pusher::Or(p) => fmt::Display::fmt(p, f),
        }
    }
}

impl From<Once> for Pusher {
    fn from(p: Once) -> Self {
        Pusher::Once(p)
    }
}

impl From<CountedDelay> for Pusher {
    fn from(p: CountedDelay) -> Self {
        Pusher::Delay(p)
    }
}

impl From<CountedRepeat> for Pusher {
    fn from(p: CountedRepeat) -> Self {
        Pusher::Times(p)
    }
}

impl From<Every> for Pusher {
    fn from(p: Every) -> Self {
        Pusher::Every(p)
    }
}

impl From<Repeat> for Pusher {
    fn from(p: Repeat) -> Self {
        Pusher::Repeat(p)
    }
}

impl From<Forever> for Pusher {
    fn from(p: Forever) -> Self {
        Pusher::Forever(p)
    }
}

impl From<Chain> for Pusher {
    fn from(p: Chain) -> Self {
        Pusher::Chain(p)
    }
}

impl From<AndChain> for Pusher {
    fn from(p: AndChain) -> Self {
        Pusher::And(p)
    }
}

impl From<OrChain> for Pusher {
    fn from(p: OrChain) -> Self {
        Pusher::Or(p)
    }
}

// ---------------------------------------------------------------------------
// Template
// ---------------------------------------------------------------------------

/// The unconsumed shape of a sub-tree.
///
/// Built from a freshly constructed node and never advanced itself; every
/// call to [`Template::instantiate`] yields an identical fresh instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(Box<Pusher>);

impl Template {
    pub fn new(fresh: impl Into<Pusher>) -> Self {
        Self(Box::new(fresh.into()))
    }

    pub fn instantiate(&self) -> Pusher {
        (*self.0).clone()
    }

    pub fn shape(&self) -> &Pusher {
        &self.0
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
