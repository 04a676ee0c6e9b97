//! Timestamped movement readings and their persisted row format.
//!
//! An [`Entry`] is immutable once built. The only way to derive a variant of
//! an existing entry is [`Entry::copy_with`], which takes explicit `Option`
//! overrides so an override of zero is never mistaken for "keep original".

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, SubsecRound};
use serde::{Deserialize, Serialize};

/// Date format used in persisted rows (`MM-DD-YYYY`).
pub const DATE_FORMAT: &str = "%m-%d-%Y";

/// Time format used in persisted rows (`HH-MM-SS`, 24 hour clock).
pub const TIME_FORMAT: &str = "%H-%M-%S";

/// Column names of a persisted log, in row order.
pub const HEADER_NAMES: [&str; 4] = ["Date", "Time", "Index", "Movement Value"];

/// One movement reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Position in the session, assigned by the store on append
    index: u64,
    /// Magnitude of detected movement
    movement_value: u32,
    /// Local wall-clock capture time, second resolution
    timestamp: NaiveDateTime,
}

/// Field overrides for [`Entry::copy_with`].
///
/// `None` keeps the original field; `Some(x)` replaces it, including
/// `Some(0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntryOverrides {
    pub index: Option<u64>,
    pub movement_value: Option<u32>,
    pub timestamp: Option<NaiveDateTime>,
}

impl Entry {
    /// Create an entry captured now.
    ///
    /// The index is a placeholder until the entry is appended to a store.
    pub fn new(movement_value: u32) -> Self {
        Self::at(movement_value, Local::now().naive_local())
    }

    /// Create an entry with an explicit capture time.
    pub fn at(movement_value: u32, timestamp: NaiveDateTime) -> Self {
        Self {
            index: 0,
            movement_value,
            timestamp: timestamp.trunc_subsecs(0),
        }
    }

    /// Create a fully specified entry, e.g. when replaying a log.
    pub fn with_index(index: u64, movement_value: u32, timestamp: NaiveDateTime) -> Self {
        Self {
            index,
            ..Self::at(movement_value, timestamp)
        }
    }

    /// Copy this entry, replacing only the fields set in `overrides`.
    pub fn copy_with(&self, overrides: EntryOverrides) -> Self {
        Self {
            index: overrides.index.unwrap_or(self.index),
            movement_value: overrides.movement_value.unwrap_or(self.movement_value),
            timestamp: overrides
                .timestamp
                .map(|t| t.trunc_subsecs(0))
                .unwrap_or(self.timestamp),
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn movement_value(&self) -> u32 {
        self.movement_value
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Capture date as `MM-DD-YYYY`.
    pub fn date_string(&self) -> String {
        self.timestamp.format(DATE_FORMAT).to_string()
    }

    /// Capture time as `HH-MM-SS`.
    pub fn time_string(&self) -> String {
        self.timestamp.format(TIME_FORMAT).to_string()
    }

    /// Header names of the persisted log.
    pub fn header_names() -> [&'static str; 4] {
        HEADER_NAMES
    }

    /// Header row as written at the top of a log file.
    pub fn header_row() -> String {
        HEADER_NAMES.join(",")
    }

    /// Serialize to `{date},{time},{index},{movement_value}`.
    pub fn to_row(&self) -> String {
        format!(
            "{},{},{},{}",
            self.date_string(),
            self.time_string(),
            self.index,
            self.movement_value
        )
    }

    /// Parse a persisted row. Surrounding whitespace and line endings are ignored.
    pub fn from_row(row: &str) -> Result<Self, ParseRowError> {
        let fields: Vec<&str> = row.trim().split(',').map(str::trim).collect();
        if fields.len() != HEADER_NAMES.len() {
            return Err(ParseRowError::FieldCount {
                found: fields.len(),
            });
        }

        let date = NaiveDate::parse_from_str(fields[0], DATE_FORMAT)
            .map_err(|_| ParseRowError::Date(fields[0].to_string()))?;
        let time = NaiveTime::parse_from_str(fields[1], TIME_FORMAT)
            .map_err(|_| ParseRowError::Time(fields[1].to_string()))?;
        let index: u64 = fields[2]
            .parse()
            .map_err(|_| ParseRowError::Index(fields[2].to_string()))?;
        let movement_value: u32 = fields[3]
            .parse()
            .map_err(|_| ParseRowError::MovementValue(fields[3].to_string()))?;

        Ok(Self::with_index(
            index,
            movement_value,
            NaiveDateTime::new(date, time),
        ))
    }
}

impl std::fmt::Display for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_row())
    }
}

/// Reasons a persisted row cannot be turned into an [`Entry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseRowError {
    FieldCount { found: usize },
    Date(String),
    Time(String),
    Index(String),
    MovementValue(String),
    /// The row is not valid UTF-8
    Encoding,
}

impl std::fmt::Display for ParseRowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseRowError::FieldCount { found } => write!(
                f,
                "expected {} fields, found {found}",
                HEADER_NAMES.len()
            ),
            ParseRowError::Date(v) => write!(f, "invalid date '{v}' (expected MM-DD-YYYY)"),
            ParseRowError::Time(v) => write!(f, "invalid time '{v}' (expected HH-MM-SS)"),
            ParseRowError::Index(v) => write!(f, "non-numeric index '{v}'"),
            ParseRowError::MovementValue(v) => write!(f, "non-numeric movement value '{v}'"),
            ParseRowError::Encoding => write!(f, "row is not valid UTF-8"),
        }
    }
}

impl std::error::Error for ParseRowError {}
