//! Core analysis engine.
//!
//! This module contains:
//! - Entries and their persisted row format
//! - The append-only entry store
//! - The incremental analyzer and its trend regression
//! - The session that composes them, plus consumer-facing views
//! - Text reports and JSON summaries built from those views

pub mod analyzer;
pub mod entry;
pub mod regression;
pub mod report;
pub mod session;
pub mod store;
pub mod summary;
pub mod view;

// Re-export commonly used types
pub use analyzer::{AnalysisError, Analyzer, AnalyzerConfig, Mode};
pub use entry::{Entry, EntryOverrides, ParseRowError};
pub use session::AnalysisSession;
pub use store::{EntryStore, RawEntry, StoreError};
pub use summary::{SessionSummary, SummaryBuilder, PRODUCER_NAME, SUMMARY_VERSION};
pub use view::{AggregateView, EntrySink};
