//! Counters for ingestion, persistence and export activity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Telemetry counters for the current session.
#[derive(Debug)]
pub struct SessionTelemetry {
    /// Entries accepted and analyzed
    entries_observed: AtomicU64,
    /// Entries above the big-movement threshold
    big_movements: AtomicU64,
    /// Values refused by the entry store
    rejected_entries: AtomicU64,
    /// Persisted rows or device lines that could not be parsed
    malformed_records: AtomicU64,
    /// Rows written to log files
    rows_written: AtomicU64,
    /// Session summaries written to disk
    summaries_exported: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
    /// Path for persisting stats
    persist_path: Option<PathBuf>,
}

impl SessionTelemetry {
    pub fn new() -> Self {
        Self {
            entries_observed: AtomicU64::new(0),
            big_movements: AtomicU64::new(0),
            rejected_entries: AtomicU64::new(0),
            malformed_records: AtomicU64::new(0),
            rows_written: AtomicU64::new(0),
            summaries_exported: AtomicU64::new(0),
            session_start: Utc::now(),
            persist_path: None,
        }
    }

    /// Create telemetry that accumulates on top of counters saved at `path`.
    pub fn with_persistence(path: PathBuf) -> Self {
        let mut telemetry = Self::new();
        telemetry.persist_path = Some(path);

        if let Err(e) = telemetry.load() {
            tracing::warn!("Could not load previous telemetry: {e}");
        }

        telemetry
    }

    pub fn record_entry_observed(&self) {
        self.entries_observed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_big_movement(&self) {
        self.big_movements.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected_entry(&self) {
        self.rejected_entries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_malformed_record(&self) {
        self.malformed_records.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_row_written(&self) {
        self.rows_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_summary_exported(&self) {
        self.summaries_exported.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn stats(&self) -> TelemetryStats {
        TelemetryStats {
            entries_observed: self.entries_observed.load(Ordering::Relaxed),
            big_movements: self.big_movements.load(Ordering::Relaxed),
            rejected_entries: self.rejected_entries.load(Ordering::Relaxed),
            malformed_records: self.malformed_records.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            summaries_exported: self.summaries_exported.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.stats();
        format!(
            "Session Statistics:\n\
             - Entries observed: {}\n\
             - Big movements: {}\n\
             - Rejected entries: {}\n\
             - Malformed records: {}\n\
             - Rows written: {}\n\
             - Summaries exported: {}\n\
             - Session duration: {} seconds",
            stats.entries_observed,
            stats.big_movements,
            stats.rejected_entries,
            stats.malformed_records,
            stats.rows_written,
            stats.summaries_exported,
            stats.session_duration_secs
        )
    }

    /// Save stats to disk.
    pub fn save(&self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            let stats = self.stats();
            let persisted = PersistedStats {
                entries_observed: stats.entries_observed,
                big_movements: stats.big_movements,
                rejected_entries: stats.rejected_entries,
                malformed_records: stats.malformed_records,
                rows_written: stats.rows_written,
                summaries_exported: stats.summaries_exported,
                last_updated: Utc::now(),
            };

            let json = serde_json::to_string_pretty(&persisted).map_err(std::io::Error::other)?;

            std::fs::write(path, json)?;
        }
        Ok(())
    }

    fn load(&mut self) -> Result<(), std::io::Error> {
        if let Some(ref path) = self.persist_path {
            if path.exists() {
                let content = std::fs::read_to_string(path)?;
                let persisted: PersistedStats =
                    serde_json::from_str(&content).map_err(std::io::Error::other)?;

                self.entries_observed
                    .store(persisted.entries_observed, Ordering::Relaxed);
                self.big_movements
                    .store(persisted.big_movements, Ordering::Relaxed);
                self.rejected_entries
                    .store(persisted.rejected_entries, Ordering::Relaxed);
                self.malformed_records
                    .store(persisted.malformed_records, Ordering::Relaxed);
                self.rows_written
                    .store(persisted.rows_written, Ordering::Relaxed);
                self.summaries_exported
                    .store(persisted.summaries_exported, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}

impl Default for SessionTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of telemetry counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryStats {
    pub entries_observed: u64,
    pub big_movements: u64,
    pub rejected_entries: u64,
    pub malformed_records: u64,
    pub rows_written: u64,
    pub summaries_exported: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Stats format for persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStats {
    entries_observed: u64,
    big_movements: u64,
    rejected_entries: u64,
    malformed_records: u64,
    rows_written: u64,
    summaries_exported: u64,
    last_updated: DateTime<Utc>,
}

/// Thread-safe shared telemetry.
pub type SharedTelemetry = Arc<SessionTelemetry>;

pub fn create_shared_telemetry() -> SharedTelemetry {
    Arc::new(SessionTelemetry::new())
}

pub fn create_shared_telemetry_with_persistence(path: PathBuf) -> SharedTelemetry {
    Arc::new(SessionTelemetry::with_persistence(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_telemetry_counting() {
        let telemetry = SessionTelemetry::new();

        telemetry.record_entry_observed();
        telemetry.record_entry_observed();
        telemetry.record_big_movement();
        telemetry.record_malformed_record();

        let stats = telemetry.stats();
        assert_eq!(stats.entries_observed, 2);
        assert_eq!(stats.big_movements, 1);
        assert_eq!(stats.malformed_records, 1);
        assert_eq!(stats.rows_written, 0);
    }

    #[test]
    fn test_telemetry_persistence() {
        let path = std::env::temp_dir()
            .join(format!("sleep-analyzer-telemetry-{}", uuid::Uuid::new_v4()))
            .join("telemetry.json");

        let telemetry = SessionTelemetry::with_persistence(path.clone());
        telemetry.record_entry_observed();
        telemetry.record_summary_exported();
        telemetry.save().unwrap();

        let reloaded = SessionTelemetry::with_persistence(path.clone());
        let stats = reloaded.stats();
        assert_eq!(stats.entries_observed, 1);
        assert_eq!(stats.summaries_exported, 1);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_summary_format() {
        let summary = SessionTelemetry::new().summary();
        assert!(summary.contains("Entries observed"));
        assert!(summary.contains("Malformed records"));
    }
}
