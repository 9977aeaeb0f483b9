use super::{exhausted, require_ticks, Push, StepResult};
use crate::codec::{self, Opcode};
use crate::error::{NewspaperError, Result};
use std::fmt;

// ---------------------------------------------------------------------------
// Once
// ---------------------------------------------------------------------------

/// Fires on its first tick, then is exhausted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Once {
    fired: bool,
}

impl Once {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Push for Once {
    fn kind(&self) -> &'static str {
        "once"
    }

    fn advance(&mut self) -> StepResult {
        if self.fired {
            exhausted(self.kind());
        }
        self.fired = true;
        StepResult::FiredAndExhausted
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        if self.fired {
            exhausted(self.kind());
        }
        if ticks == 0 {
            return (0, StepResult::Idle);
        }
        (1, self.advance())
    }

    fn ttl(&self) -> u64 {
        if self.fired {
            0
        } else {
            1
        }
    }

    fn is_exhausted(&self) -> bool {
        self.fired
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        if self.fired {
            return Err(NewspaperError::EncodeExhausted { kind: self.kind() });
        }
        codec::put_op(buf, Opcode::Once);
        Ok(())
    }
}

impl fmt::Display for Once {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("once")
    }
}

// ---------------------------------------------------------------------------
// CountedDelay
// ---------------------------------------------------------------------------

/// Stays idle for `n - 1` ticks and fires on tick `n`, then is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedDelay {
    remaining: u64,
}

impl CountedDelay {
    pub fn new(n: u64) -> Result<Self> {
        Ok(Self::with_remaining(require_ticks("delay", n)?))
    }

    /// Resume with a known-positive remaining count.
    pub(crate) fn with_remaining(remaining: u64) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Push for CountedDelay {
    fn kind(&self) -> &'static str {
        "delay"
    }

    fn advance(&mut self) -> StepResult {
        if self.remaining == 0 {
            exhausted(self.kind());
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            StepResult::FiredAndExhausted
        } else {
            StepResult::Idle
        }
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        if self.remaining == 0 {
            exhausted(self.kind());
        }
        if ticks < self.remaining {
            self.remaining -= ticks;
            return (ticks, StepResult::Idle);
        }
        let consumed = self.remaining;
        self.remaining = 0;
        (consumed, StepResult::FiredAndExhausted)
    }

    fn ttl(&self) -> u64 {
        self.remaining
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        if self.remaining == 0 {
            return Err(NewspaperError::EncodeExhausted { kind: self.kind() });
        }
        codec::put_op(buf, Opcode::CountedDelay);
        codec::put_uvarint(buf, self.remaining);
        Ok(())
    }
}

impl fmt::Display for CountedDelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "after({})", self.remaining)
    }
}

// ---------------------------------------------------------------------------
// CountedRepeat
// ---------------------------------------------------------------------------

/// Fires on each of the next `n` ticks, then is exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountedRepeat {
    remaining: u64,
}

impl CountedRepeat {
    pub fn new(n: u64) -> Result<Self> {
        Ok(Self::with_remaining(require_ticks("times", n)?))
    }

    pub(crate) fn with_remaining(remaining: u64) -> Self {
        Self { remaining }
    }

    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Push for CountedRepeat {
    fn kind(&self) -> &'static str {
        "times"
    }

    fn advance(&mut self) -> StepResult {
        if self.remaining == 0 {
            exhausted(self.kind());
        }
        self.remaining -= 1;
        if self.remaining == 0 {
            StepResult::FiredAndExhausted
        } else {
            StepResult::Fired
        }
    }

    fn advance_many(&mut self, ticks: u64) -> (u64, StepResult) {
        if self.remaining == 0 {
            exhausted(self.kind());
        }
        if ticks == 0 {
            return (0, StepResult::Idle);
        }
        if ticks < self.remaining {
            self.remaining -= ticks;
            return (ticks, StepResult::Fired);
        }
        let consumed = self.remaining;
        self.remaining = 0;
        (consumed, StepResult::FiredAndExhausted)
    }

    fn ttl(&self) -> u64 {
        self.remaining.min(1)
    }

    fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    fn write_encoding(&self, buf: &mut Vec<u8>) -> Result<()> {
        if self.remaining == 0 {
            return Err(NewspaperError::EncodeExhausted { kind: self.kind() });
        }
        codec::put_op(buf, Opcode::CountedRepeat);
        codec::put_uvarint(buf, self.remaining);
        Ok(())
    }
}

impl fmt::Display for CountedRepeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "times({})", self.remaining)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
