//! One recording or replay session: an entry store, its analyzer and the
//! injected telemetry, behind a single ingestion path.

use crate::core::analyzer::{AnalysisError, Analyzer, AnalyzerConfig, Mode};
use crate::core::entry::Entry;
use crate::core::store::{EntryStore, StoreError};
use crate::core::view::AggregateView;
use crate::telemetry::SharedTelemetry;
use chrono::NaiveDateTime;

/// Stores each entry, then lets the analyzer observe it.
pub struct AnalysisSession {
    session_id: String,
    store: EntryStore,
    analyzer: Analyzer,
    telemetry: Option<SharedTelemetry>,
}

impl AnalysisSession {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            session_id: format!("SESS-{}", chrono::Utc::now().timestamp_millis()),
            store: EntryStore::new(),
            analyzer: Analyzer::new(config),
            telemetry: None,
        }
    }

    /// Set the session ID (e.g. the replayed file name).
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    /// Report ingestion activity to `telemetry`.
    pub fn with_telemetry(mut self, telemetry: SharedTelemetry) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Append an entry and update every aggregate.
    ///
    /// A rejected value leaves the store and the analyzer untouched. Returns
    /// the stored entry with its assigned index.
    pub fn ingest<E>(&mut self, entry: E) -> Result<Entry, StoreError>
    where
        E: TryInto<Entry>,
        StoreError: From<E::Error>,
    {
        if let Err(e) = self.store.append(entry) {
            tracing::warn!(session = %self.session_id, "Rejected entry: {e}");
            if let Some(ref telemetry) = self.telemetry {
                telemetry.record_rejected_entry();
            }
            return Err(e);
        }

        let entry = *self.store.last().ok_or(StoreError::EmptyStore)?;
        self.analyzer.observe(&entry);

        if let Some(ref telemetry) = self.telemetry {
            telemetry.record_entry_observed();
            if self.analyzer.is_big_movement(entry.movement_value()) {
                telemetry.record_big_movement();
            }
        }

        Ok(entry)
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn config(&self) -> &AnalyzerConfig {
        self.analyzer.config()
    }

    /// Capture time of the first entry.
    pub fn started_at(&self) -> Option<NaiveDateTime> {
        self.store.first().map(Entry::timestamp)
    }

    /// Capture time of the latest entry.
    pub fn last_entry_at(&self) -> Option<NaiveDateTime> {
        self.store.last().map(Entry::timestamp)
    }
}

impl AggregateView for AnalysisSession {
    fn entry_count(&self) -> usize {
        self.store.len()
    }

    fn max_value(&self) -> Result<u32, AnalysisError> {
        self.analyzer.max_value()
    }

    fn mode(&self) -> Result<Mode, AnalysisError> {
        self.analyzer.mode()
    }

    fn mean(&self) -> Result<f64, AnalysisError> {
        self.analyzer.mean()
    }

    fn big_movement_entries(&self) -> Vec<&Entry> {
        self.analyzer.big_movement_entries(&self.store).collect()
    }

    fn trailing_sum_series(&self) -> &[u64] {
        self.analyzer.trailing_sum_series()
    }

    fn decaying_score_series(&self) -> &[u64] {
        self.analyzer.decaying_score_series()
    }

    fn trend_coefficients(&self) -> &[f64] {
        self.analyzer.trend_coefficients()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::RawEntry;
    use crate::telemetry::create_shared_telemetry;

    #[test]
    fn test_ingest_updates_store_and_analyzer() {
        let mut session = AnalysisSession::new(AnalyzerConfig::default());
        for value in [4, 0, 6] {
            session.ingest(Entry::new(value)).unwrap();
        }

        assert_eq!(session.entry_count(), 3);
        assert_eq!(session.analyzer().observed(), 3);
        assert_eq!(session.max_value(), Ok(6));
        assert_eq!(session.trailing_sum_series(), &[4, 4, 10]);
        assert_eq!(session.big_movement_entries().len(), 2);
    }

    #[test]
    fn test_rejected_entry_changes_nothing() {
        let telemetry = create_shared_telemetry();
        let mut session =
            AnalysisSession::new(AnalyzerConfig::default()).with_telemetry(telemetry.clone());
        session.ingest(Entry::new(2)).unwrap();

        let result = session.ingest(RawEntry {
            movement_value: -1,
            timestamp: None,
        });
        assert!(matches!(result, Err(StoreError::InvalidEntryType(_))));
        assert_eq!(session.entry_count(), 1);
        assert_eq!(session.analyzer().observed(), 1);
        assert_eq!(session.trend_coefficients().len(), 1);

        let stats = telemetry.stats();
        assert_eq!(stats.entries_observed, 1);
        assert_eq!(stats.rejected_entries, 1);
        assert_eq!(stats.big_movements, 1);
    }

    #[test]
    fn test_ingest_returns_assigned_index() {
        let mut session = AnalysisSession::new(AnalyzerConfig::default()).with_session_id("night-1");
        assert_eq!(session.ingest(Entry::new(1)).unwrap().index(), 0);
        assert_eq!(session.ingest(Entry::new(1)).unwrap().index(), 1);
        assert_eq!(session.session_id(), "night-1");
        assert!(session.started_at() <= session.last_entry_at());
    }
}
