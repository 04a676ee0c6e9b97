//! JSON session summaries.
//!
//! A summary is the only thing kept from a session once its entries are
//! discarded. It is built from the [`AggregateView`] of a finished (or
//! interrupted) session and written next to the other exports.

use crate::core::analyzer::{AnalyzerConfig, Mode};
use crate::core::session::AnalysisSession;
use crate::core::view::AggregateView;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::path::Path;
use uuid::Uuid;

/// The current summary format version.
pub const SUMMARY_VERSION: &str = "1.0";

/// The name of this producer.
pub const PRODUCER_NAME: &str = "sleep-analyzer";

/// Producer metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryProducer {
    pub name: String,
    pub version: String,
    /// Unique instance identifier (UUID)
    pub instance_id: String,
}

/// Persisted aggregate state of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub summary_version: String,
    pub producer: SummaryProducer,
    pub session_id: String,
    /// When this summary was computed (RFC3339)
    pub computed_at_utc: String,
    /// Capture time of the first entry (local, `YYYY-MM-DDTHH:MM:SS`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_entry_at: Option<String>,
    /// Capture time of the last entry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_entry_at: Option<String>,
    pub entry_count: usize,
    pub max_value: Option<u32>,
    pub mode: Option<Mode>,
    pub mean: Option<f64>,
    /// Sample standard deviation of movement values (needs two entries)
    pub movement_std_dev: Option<f64>,
    pub big_movement_count: usize,
    /// Entries whose trailing sum exceeded the configured alert level
    pub sum_alerts: u64,
    pub latest_trailing_sum: Option<u64>,
    pub latest_decaying_score: Option<u64>,
    pub latest_trend: Option<f64>,
    /// Analyzer settings the aggregates were computed with
    pub analyzer: AnalyzerConfig,
}

impl SessionSummary {
    /// Write the summary as pretty-printed JSON.
    pub fn write_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// File name for this summary, e.g. `summary_SESS-1700000000000.json`.
    pub fn file_name(&self) -> String {
        let safe_id: String = self
            .session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("summary_{safe_id}.json")
    }
}

/// Builder for session summaries.
pub struct SummaryBuilder {
    instance_id: Uuid,
}

impl SummaryBuilder {
    /// Create a new builder with a unique instance ID.
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4(),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Build a summary from the current state of `session`.
    pub fn build(&self, session: &AnalysisSession) -> SessionSummary {
        let values: Vec<f64> = session.store().values().map(f64::from).collect();
        let movement_std_dev = if values.len() >= 2 {
            Some(values.iter().std_dev())
        } else {
            None
        };

        SessionSummary {
            summary_version: SUMMARY_VERSION.to_string(),
            producer: SummaryProducer {
                name: PRODUCER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                instance_id: self.instance_id.to_string(),
            },
            session_id: session.session_id().to_string(),
            computed_at_utc: Utc::now().to_rfc3339(),
            first_entry_at: session.started_at().map(|t| t.to_string()),
            last_entry_at: session.last_entry_at().map(|t| t.to_string()),
            entry_count: session.entry_count(),
            max_value: session.max_value().ok(),
            mode: session.mode().ok(),
            mean: session.mean().ok(),
            movement_std_dev,
            big_movement_count: session.analyzer().big_movement_indices().len(),
            sum_alerts: session.analyzer().sum_alerts(),
            latest_trailing_sum: session.trailing_sum_series().last().copied(),
            latest_decaying_score: session.decaying_score_series().last().copied(),
            latest_trend: session.latest_trend(),
            analyzer: session.config().clone(),
        }
    }
}

impl Default for SummaryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
