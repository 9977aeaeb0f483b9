use std::path::PathBuf;
use thiserror::Error;

use crate::codec::DecodeFault;

#[derive(Debug, Error)]
pub enum NewspaperError {
    #[error("invalid tick count for {kind}: {value} (must be greater than zero)")]
    InvalidTicks { kind: &'static str, value: u64 },

    #[error("{kind} needs at least one member")]
    EmptyCombinator { kind: &'static str },

    #[error("cannot encode exhausted {kind}")]
    EncodeExhausted { kind: &'static str },

    #[error("cannot encode template of {kind}")]
    EncodeTemplate {
        kind: &'static str,
        #[source]
        source: Box<NewspaperError>,
    },

    #[error("malformed schedule encoding at byte {offset}: {fault}")]
    Decode { offset: usize, fault: DecodeFault },

    #[error("malformed schedule token: {0}")]
    InvalidToken(String),

    #[error("schedule is exhausted and cannot advance")]
    ScheduleExhausted,

    #[error("action '{0}' needs a parent element")]
    MissingElement(&'static str),

    #[error("note not found: {}", .0.display())]
    NoteNotFound(PathBuf),

    #[error("cannot roll from {from} to {to}: target must be a later day")]
    InvalidRoll { from: String, to: String },

    #[error("invalid date '{input}' for format '{format}'")]
    InvalidDate { input: String, format: String },

    #[error("invalid note format '{0}'")]
    InvalidFormat(String),

    #[error("date offset of {0} days is out of range")]
    DateOutOfRange(i64),

    #[error("config not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NewspaperError>;
