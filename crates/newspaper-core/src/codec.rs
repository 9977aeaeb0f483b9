//! Binary encoding of a schedule tree's remaining state.
//!
//! Every node starts or ends with a one-byte opcode. Numeric arguments are
//! unsigned LEB128 varints.
//!
//! ```text
//! after(n)       [0x01][n]
//! once           [0x02]
//! times(n)       [0x03][n]
//! every(c)       [pending after(r)][0x04][c]
//! repeat         [live][0x05][remaining][template][0x07]
//! forever        [live][0x06][template][0x07]
//! chain/and/or   [0x08|0x09|0x0A][member]...[0x07]
//! ```
//!
//! `every`, `repeat` and `forever` bind to the node written immediately
//! before them. The template is the fresh shape a composite regenerates
//! from, so an unbounded cycle costs one template encoding.

use crate::error::{NewspaperError, Result};
use crate::pusher::{
    AndChain, Chain, CountedDelay, CountedRepeat, Every, Forever, Once, OrChain, Push, Pusher,
    Repeat, Template,
};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use std::fmt;
use thiserror::Error;

/// Deepest nesting accepted from untrusted input.
pub const MAX_DEPTH: usize = 64;

// ---------------------------------------------------------------------------
// Opcode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    CountedDelay = 0x01,
    Once = 0x02,
    CountedRepeat = 0x03,
    Every = 0x04,
    Repeat = 0x05,
    Forever = 0x06,
    EndOfSequence = 0x07,
    Chain = 0x08,
    AndChain = 0x09,
    OrChain = 0x0A,
}

const OPCODES: [Opcode; 10] = [
    Opcode::CountedDelay,
    Opcode::Once,
    Opcode::CountedRepeat,
    Opcode::Every,
    Opcode::Repeat,
    Opcode::Forever,
    Opcode::EndOfSequence,
    Opcode::Chain,
    Opcode::AndChain,
    Opcode::OrChain,
];

impl Opcode {
    pub fn all() -> &'static [Opcode] {
        &OPCODES
    }

    pub fn from_byte(byte: u8) -> Option<Opcode> {
        OPCODES.iter().copied().find(|op| *op as u8 == byte)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Opcode::CountedDelay => "delay",
            Opcode::Once => "once",
            Opcode::CountedRepeat => "times",
            Opcode::Every => "every",
            Opcode::Repeat => "repeat",
            Opcode::Forever => "forever",
            Opcode::EndOfSequence => "end",
            Opcode::Chain => "chain",
            Opcode::AndChain => "and-chain",
            Opcode::OrChain => "or-chain",
        }
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

pub(crate) fn put_op(buf: &mut Vec<u8>, op: Opcode) {
    buf.push(op as u8);
}

pub(crate) fn put_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFault {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unknown opcode 0x{0:02x}")]
    UnknownOpcode(u8),

    #[error("truncated varint")]
    TruncatedVarint,

    #[error("varint overflows 64 bits")]
    VarintOverflow,

    #[error("missing end-of-sequence marker")]
    MissingTerminator,

    #[error("end-of-sequence marker where a node was expected")]
    UnexpectedTerminator,

    #[error("{0} has no preceding node to wrap")]
    DanglingComposite(&'static str),

    #[error("{0} count must be greater than zero")]
    ZeroCount(&'static str),

    #[error("{0} has no members")]
    EmptySequence(&'static str),

    #[error("every({0}) must wrap a pending delay of at most {0} ticks")]
    EveryPending(u64),

    #[error("template is not in its initial state")]
    StaleTemplate,

    #[error("nesting deeper than {} levels", MAX_DEPTH)]
    TooDeep,

    #[error("{0} trailing bytes after the schedule")]
    TrailingBytes(usize),
}

/// Decode a complete schedule tree. The whole buffer must be consumed.
pub fn decode(bytes: &[u8]) -> Result<Pusher> {
    let mut decoder = Decoder { bytes, pos: 0 };
    let pusher = decoder.node(0)?;
    if decoder.pos < bytes.len() {
        return Err(decoder.fault_at(
            decoder.pos,
            DecodeFault::TrailingBytes(bytes.len() - decoder.pos),
        ));
    }
    Ok(pusher)
}

struct Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl Decoder<'_> {
    fn fault_at(&self, offset: usize, fault: DecodeFault) -> NewspaperError {
        NewspaperError::Decode { offset, fault }
    }

    fn node(&mut self, mut depth: usize) -> Result<Pusher> {
        let start = self.pos;
        if depth > MAX_DEPTH {
            return Err(self.fault_at(start, DecodeFault::TooDeep));
        }
        let op = self.opcode()?;
        let mut node: Pusher = match op {
            Opcode::CountedDelay => CountedDelay::with_remaining(self.count(op)?).into(),
            Opcode::Once => Once::new().into(),
            Opcode::CountedRepeat => CountedRepeat::with_remaining(self.count(op)?).into(),
            Opcode::Chain => Chain::from_members(self.members(op, start, depth)?).into(),
            Opcode::AndChain => AndChain::from_members(self.members(op, start, depth)?).into(),
            Opcode::OrChain => OrChain::from_members(self.members(op, start, depth)?).into(),
            Opcode::Every | Opcode::Repeat | Opcode::Forever => {
                return Err(self.fault_at(start, DecodeFault::DanglingComposite(op.as_str())));
            }
            Opcode::EndOfSequence => {
                return Err(self.fault_at(start, DecodeFault::UnexpectedTerminator));
            }
        };

        // Postfix composites wrap whatever was decoded so far.
        loop {
            let at = self.pos;
            if depth > MAX_DEPTH {
                return Err(self.fault_at(at, DecodeFault::TooDeep));
            }
            node = match self.peek() {
                Some(Opcode::Every) => {
                    self.pos += 1;
                    let cycle = self.count(Opcode::Every)?;
                    match node {
                        Pusher::Delay(pending) if pending.remaining() <= cycle => {
                            Every::resume(pending, cycle).into()
                        }
                        _ => return Err(self.fault_at(at, DecodeFault::EveryPending(cycle))),
                    }
                }
                Some(Opcode::Repeat) => {
                    self.pos += 1;
                    let remaining = self.uvarint()?;
                    let template = self.template(depth)?;
                    Repeat::resume(node, remaining, template).into()
                }
                Some(Opcode::Forever) => {
                    self.pos += 1;
                    let template = self.template(depth)?;
                    Forever::resume(node, template).into()
                }
                _ => return Ok(node),
            };
            depth += 1;
        }
    }

    fn members(&mut self, op: Opcode, start: usize, depth: usize) -> Result<Vec<Pusher>> {
        let mut members = Vec::new();
        loop {
            match self.bytes.get(self.pos) {
                None => return Err(self.fault_at(self.pos, DecodeFault::MissingTerminator)),
                Some(&byte) if byte == Opcode::EndOfSequence as u8 => {
                    self.pos += 1;
                    break;
                }
                Some(_) => members.push(self.node(depth + 1)?),
            }
        }
        if members.is_empty() {
            return Err(self.fault_at(start, DecodeFault::EmptySequence(op.as_str())));
        }
        Ok(members)
    }

    fn template(&mut self, depth: usize) -> Result<Template> {
        let start = self.pos;
        let shape = self.node(depth + 1)?;
        if !is_fresh(&shape) {
            return Err(self.fault_at(start, DecodeFault::StaleTemplate));
        }
        match self.bytes.get(self.pos) {
            Some(&byte) if byte == Opcode::EndOfSequence as u8 => {
                self.pos += 1;
                Ok(Template::new(shape))
            }
            _ => Err(self.fault_at(self.pos, DecodeFault::MissingTerminator)),
        }
    }

    fn peek(&self) -> Option<Opcode> {
        self.bytes.get(self.pos).and_then(|b| Opcode::from_byte(*b))
    }

    fn opcode(&mut self) -> Result<Opcode> {
        let Some(&byte) = self.bytes.get(self.pos) else {
            return Err(self.fault_at(self.pos, DecodeFault::UnexpectedEnd));
        };
        let op = Opcode::from_byte(byte)
            .ok_or_else(|| self.fault_at(self.pos, DecodeFault::UnknownOpcode(byte)))?;
        self.pos += 1;
        Ok(op)
    }

    fn count(&mut self, op: Opcode) -> Result<u64> {
        let start = self.pos;
        let value = self.uvarint()?;
        if value == 0 {
            return Err(self.fault_at(start, DecodeFault::ZeroCount(op.as_str())));
        }
        Ok(value)
    }

    fn uvarint(&mut self) -> Result<u64> {
        let start = self.pos;
        let mut value: u64 = 0;
        let mut shift = 0u32;
        loop {
            let Some(&byte) = self.bytes.get(self.pos) else {
                return Err(self.fault_at(start, DecodeFault::TruncatedVarint));
            };
            self.pos += 1;
            if shift == 63 && byte > 1 {
                return Err(self.fault_at(start, DecodeFault::VarintOverflow));
            }
            value |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(value);
            }
            shift += 7;
        }
    }
}

/// Whether `node` is still in the state it was constructed in.
fn is_fresh(node: &Pusher) -> bool {
    match node {
        Pusher::Once(once) => !once.is_exhausted(),
        Pusher::Delay(_) | Pusher::Times(_) => true,
        Pusher::Every(every) => every.pending().remaining() == every.cycle(),
        Pusher::Repeat(repeat) => {
            is_fresh(repeat.template().shape()) && *repeat.live() == repeat.template().instantiate()
        }
        Pusher::Forever(forever) => {
            is_fresh(forever.template().shape())
                && *forever.live() == forever.template().instantiate()
        }
        Pusher::Chain(chain) => chain.members().all(is_fresh),
        Pusher::And(chain) => chain.members().iter().all(is_fresh),
        Pusher::Or(chain) => chain.members().iter().all(is_fresh),
    }
}

// ---------------------------------------------------------------------------
// Text transport
// ---------------------------------------------------------------------------

/// Render encoded bytes as a note-safe token.
pub fn to_text(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

pub fn from_text(text: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(text)
        .map_err(|e| NewspaperError::InvalidToken(format!("'{text}': {e}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
