pub mod codec;
pub mod config;
pub mod error;
pub mod io;
pub mod note;
pub mod paths;
pub mod pusher;
pub mod roll;
pub mod schedule;
pub mod timeline;

pub use error::{NewspaperError, Result};
