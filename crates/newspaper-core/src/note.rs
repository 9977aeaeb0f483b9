use crate::codec;
use crate::error::{NewspaperError, Result};
use crate::schedule::{Action, Element, Schedule};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

static TOKEN_RE: OnceLock<Regex> = OnceLock::new();

fn token_re() -> &'static Regex {
    TOKEN_RE.get_or_init(|| Regex::new(r"\{np:([A-Za-z0-9_-]*):([A-Za-z0-9_-]+)\}").unwrap())
}

/// The persisted form of a schedule inside a note: `{np:<state>:<origin>}`,
/// both halves base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub state: String,
    pub origin: String,
}

impl Token {
    pub fn for_schedule(schedule: &Schedule) -> Result<Self> {
        Ok(Self {
            state: codec::to_text(&schedule.encode_state()?),
            origin: codec::to_text(&schedule.encode_origin()?),
        })
    }

    /// Accepts either the braced form or the bare `<state>:<origin>` pair.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let braced = if text.starts_with('{') {
            text.to_string()
        } else {
            format!("{{np:{text}}}")
        };
        let caps = token_re()
            .captures(&braced)
            .filter(|c| c.get(0).map(|m| m.as_str().len()) == Some(braced.len()))
            .ok_or_else(|| NewspaperError::InvalidToken(text.to_string()))?;
        Ok(Self {
            state: caps[1].to_string(),
            origin: caps[2].to_string(),
        })
    }

    /// Rebuild the schedule. An unreadable state restarts from the origin.
    pub fn resume(&self, action: Box<dyn Action>) -> Result<Schedule> {
        let origin = codec::from_text(&self.origin)?;
        let state = codec::from_text(&self.state).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "schedule state token unreadable");
            Vec::new()
        });
        Schedule::resume(&state, &origin, action)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{np:{}:{}}}", self.state, self.origin)
    }
}

// ---------------------------------------------------------------------------
// NoteLine / ScheduledLine
// ---------------------------------------------------------------------------

/// A note line with its schedule token stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteLine {
    text: String,
}

impl NoteLine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Element for NoteLine {
    fn text(&self) -> &str {
        &self.text
    }

    fn completed(&self) -> bool {
        let t = self.text.trim_start();
        t.starts_with("- [x]") || t.starts_with("- [X]")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledLine {
    /// 1-based line number in the note.
    pub line: usize,
    pub element: NoteLine,
    pub token: Token,
}

/// Find every line carrying a schedule token. Only the first token on a
/// line counts.
pub fn scan(text: &str) -> Vec<ScheduledLine> {
    text.lines()
        .enumerate()
        .filter_map(|(i, raw)| {
            let caps = token_re().captures(raw)?;
            let whole = caps.get(0)?;
            let stripped = format!("{}{}", &raw[..whole.start()], &raw[whole.end()..]);
            Some(ScheduledLine {
                line: i + 1,
                element: NoteLine::new(stripped.trim_end()),
                token: Token {
                    state: caps[1].to_string(),
                    origin: caps[2].to_string(),
                },
            })
        })
        .collect()
}

/// `text` followed by a token for the schedule's current state.
pub fn render_line(text: &str, schedule: &Schedule) -> Result<String> {
    let token = Token::for_schedule(schedule)?;
    let text = text.trim_end();
    if text.is_empty() {
        Ok(token.to_string())
    } else {
        Ok(format!("{text} {token}"))
    }
}
