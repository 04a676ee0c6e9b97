//! Sleep Analyzer - live movement logger and incremental analyzer.
//!
//! This library records one movement value per reading from a motion sensor,
//! persists every reading to a CSV session log and keeps running statistics
//! up to date as each entry arrives.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Sleep Analyzer                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Source    │──▶│ EntryStore  │──▶│  Analyzer   │       │
//! │  │(device/log) │   │ (append)    │   │(incremental)│       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │         │                                    │              │
//! │         ▼                                    ▼              │
//! │  ┌─────────────┐                     ┌─────────────┐       │
//! │  │  LogWriter  │                     │Report/Summary│      │
//! │  │ (.slp.csv)  │                     │   (JSON)    │       │
//! │  └─────────────┘                     └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use sleep_analyzer::core::{AggregateView, AnalysisSession, AnalyzerConfig, Entry};
//!
//! let mut session = AnalysisSession::new(AnalyzerConfig::default());
//! for value in [1, 0, 12, 0] {
//!     session.ingest(Entry::new(value)).expect("valid entry");
//! }
//!
//! assert_eq!(session.max_value().unwrap(), 12);
//! println!("{}", sleep_analyzer::core::report::render(&session));
//! ```

pub mod config;
pub mod core;
pub mod logfile;
pub mod source;
pub mod telemetry;

#[cfg(feature = "upload")]
pub mod upload;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, UploadSettings};
pub use core::{
    AggregateView, AnalysisError, AnalysisSession, Analyzer, AnalyzerConfig, Entry, EntryStore,
    Mode, SessionSummary, StoreError, SummaryBuilder,
};
pub use logfile::{LogFileReader, LogWriter, RecordError};
pub use source::{ChannelSource, LineSource, Reading, ReadingSource};
pub use telemetry::{SessionTelemetry, SharedTelemetry, TelemetryStats};

// Upload re-exports (when enabled)
#[cfg(feature = "upload")]
pub use upload::{BlockingUploadClient, UploadClient, UploadConfig, UploadError, UploadReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
