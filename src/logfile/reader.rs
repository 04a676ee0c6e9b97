//! Replay of persisted session logs.
//!
//! [`LogFileReader`] is a pull-based iterator: each `next()` reads exactly one
//! row, so entries reach the analyzer one at a time and in file order.

use crate::core::{Entry, ParseRowError};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Errors produced while replaying a log.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// A row could not be parsed into an entry
    MalformedRecord {
        /// 1-based line number in the file
        line: usize,
        reason: ParseRowError,
        /// Last row that parsed successfully, to help locate corruption
        last_good: Option<Entry>,
    },
    /// The file has no header row
    MissingHeader,
    Io(String),
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordError::MalformedRecord {
                line,
                reason,
                last_good,
            } => {
                write!(f, "Malformed record on line {line}: {reason}")?;
                if let Some(entry) = last_good {
                    write!(f, " (last correct row: {entry})")?;
                }
                Ok(())
            }
            RecordError::MissingHeader => write!(f, "Log file has no header row"),
            RecordError::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for RecordError {}

/// Iterates the entries of a session log.
pub struct LogFileReader<R> {
    reader: R,
    buffer: Vec<u8>,
    line: usize,
    total_size: u64,
    total_read: u64,
    last_good: Option<Entry>,
    /// First line of a headerless log, handed out before reading on
    pending: Option<Result<Entry, RecordError>>,
    finished: bool,
}

impl LogFileReader<BufReader<File>> {
    /// Open a log file and consume its header row.
    pub fn open(path: &Path) -> Result<Self, RecordError> {
        let file = File::open(path).map_err(|e| RecordError::Io(e.to_string()))?;
        let total_size = file
            .metadata()
            .map_err(|e| RecordError::Io(e.to_string()))?
            .len();
        Self::from_reader(BufReader::new(file), total_size)
    }
}

impl<R: BufRead> LogFileReader<R> {
    /// Wrap a reader holding `total_size` bytes and consume its header row.
    ///
    /// A first line that parses as a row is kept as data rather than
    /// treated as a header.
    pub fn from_reader(reader: R, total_size: u64) -> Result<Self, RecordError> {
        let mut log = Self {
            reader,
            buffer: Vec::new(),
            line: 0,
            total_size,
            total_read: 0,
            last_good: None,
            pending: None,
            finished: false,
        };

        let header = log
            .read_row()
            .map_err(|e| RecordError::Io(e.to_string()))?
            .ok_or(RecordError::MissingHeader)?;

        match header {
            Ok(header) if header == Entry::header_row() => {
                tracing::debug!("CSV headers: {header}");
            }
            Ok(header) => match Entry::from_row(&header) {
                Ok(entry) => {
                    tracing::warn!("Log has no header row, reading line 1 as data");
                    log.last_good = Some(entry);
                    log.pending = Some(Ok(entry));
                }
                Err(_) => {
                    tracing::warn!(
                        "Unexpected log header '{header}', expected '{}'",
                        Entry::header_row()
                    );
                }
            },
            Err(reason) => {
                log.pending = Some(Err(RecordError::MalformedRecord {
                    line: log.line,
                    reason,
                    last_good: None,
                }));
            }
        }

        Ok(log)
    }

    /// Percentage of the file consumed so far, 0 to 100.
    pub fn progress_percent(&self) -> f64 {
        if self.total_size == 0 {
            return 100.0;
        }
        ((self.total_read as f64 / self.total_size as f64) * 100.0).min(100.0)
    }

    /// Last row that parsed successfully.
    pub fn last_good(&self) -> Option<&Entry> {
        self.last_good.as_ref()
    }

    /// Read one line as trimmed text; `None` at end of file.
    ///
    /// A line that is not UTF-8 is still consumed, so reading can go on.
    fn read_row(&mut self) -> std::io::Result<Option<Result<String, ParseRowError>>> {
        self.buffer.clear();
        let read = self.reader.read_until(b'\n', &mut self.buffer)?;
        if read == 0 {
            return Ok(None);
        }
        self.line += 1;
        self.total_read += read as u64;
        Ok(Some(match std::str::from_utf8(&self.buffer) {
            Ok(text) => Ok(text.trim().to_string()),
            Err(_) => Err(ParseRowError::Encoding),
        }))
    }
}

impl<R: BufRead> Iterator for LogFileReader<R> {
    type Item = Result<Entry, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(pending) = self.pending.take() {
            return Some(pending);
        }
        if self.finished {
            return None;
        }

        loop {
            let row = match self.read_row() {
                Ok(Some(row)) => row,
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(RecordError::Io(e.to_string())));
                }
            };

            let parsed = match row {
                Ok(ref text) if text.is_empty() => continue,
                Ok(text) => Entry::from_row(&text),
                Err(reason) => Err(reason),
            };

            return Some(match parsed {
                Ok(entry) => {
                    self.last_good = Some(entry);
                    Ok(entry)
                }
                Err(reason) => Err(RecordError::MalformedRecord {
                    line: self.line,
                    reason,
                    last_good: self.last_good,
                }),
            });
        }
    }
}
