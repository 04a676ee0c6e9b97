//! Narrow interfaces between the analysis engine and its consumers.
//!
//! Renderers, exporters and uploaders read aggregates through
//! [`AggregateView`]; persistence receives entries through [`EntrySink`].
//! Neither can mutate the engine.

use crate::core::analyzer::{AnalysisError, Mode};
use crate::core::entry::Entry;

/// Read-only access to the aggregates of an analysis session.
pub trait AggregateView {
    /// Number of entries stored and analyzed.
    fn entry_count(&self) -> usize;

    fn max_value(&self) -> Result<u32, AnalysisError>;

    fn mode(&self) -> Result<Mode, AnalysisError>;

    fn mean(&self) -> Result<f64, AnalysisError>;

    /// Entries above the big-movement threshold, in append order.
    fn big_movement_entries(&self) -> Vec<&Entry>;

    fn trailing_sum_series(&self) -> &[u64];

    /// Decaying score, including its two seed zeros.
    fn decaying_score_series(&self) -> &[u64];

    fn trend_coefficients(&self) -> &[f64];

    /// Most recent trend coefficient, if any entry was observed.
    fn latest_trend(&self) -> Option<f64> {
        self.trend_coefficients().last().copied()
    }
}

/// Destination for entries as they are recorded.
pub trait EntrySink {
    fn write_entry(&mut self, entry: &Entry) -> std::io::Result<()>;

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
