//! Session log files.
//!
//! Logs are comma-separated with a `Date,Time,Index,Movement Value` header
//! and one `\r\n`-terminated row per entry. Live sessions are written with
//! [`LogWriter`]; historical sessions are replayed with [`LogFileReader`].

pub mod reader;
pub mod writer;

pub use reader::{LogFileReader, RecordError};
pub use writer::{log_file_name, LogWriter, LOG_FILE_SUFFIX};
