//! Session telemetry for the analyzer.
//!
//! Counters describing what a recording or replay session did, injected
//! into [`crate::core::AnalysisSession`] instead of living in global state.

pub mod log;

// Re-export commonly used types
pub use log::{
    create_shared_telemetry, create_shared_telemetry_with_persistence, SessionTelemetry,
    SharedTelemetry, TelemetryStats,
};
