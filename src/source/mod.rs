//! Reading sources for the analyzer.
//!
//! A reading source yields one movement value at a time from a device or
//! any other line-oriented stream. Persisted logs are replayed through
//! [`crate::logfile::LogFileReader`] instead, since their rows already
//! carry timestamps and indices.

pub mod channel;
pub mod line;
pub mod types;

// Re-export commonly used types
pub use channel::{ChannelSource, SourceError, DEFAULT_CHANNEL_CAPACITY};
pub use line::LineSource;
pub use types::{parse_reading, Reading, ReadingSource};
