//! Incremental movement statistics.
//!
//! The [`Analyzer`] observes each appended [`Entry`] once, in append order,
//! and keeps every aggregate up to date in O(1) amortized time per entry
//! (the trend fit is O(K) over a small fixed window).
//!
//! Raw entries stay in the [`EntryStore`]; the analyzer only keeps store
//! indices for big movements and a bounded window of values for the
//! trailing sum.

use crate::config::ConfigError;
use crate::core::entry::Entry;
use crate::core::regression::positional_slope;
use crate::core::store::EntryStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Default number of entries summed by the trailing sum.
pub const DEFAULT_TRAILING_WINDOW: usize = 1000;

/// Default number of decaying-score values used for each trend fit.
pub const DEFAULT_REGRESSION_WINDOW: usize = 50;

/// Tunables for an [`Analyzer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Number of entries in the trailing sum (W)
    pub trailing_window: usize,
    /// Number of decaying-score values in each trend fit (K)
    pub regression_window: usize,
    /// Entries strictly above this value count as big movements
    pub min_movement_value: u32,
    /// Trailing sums above this value are reported in the log
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_movement_sum: Option<u64>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            trailing_window: DEFAULT_TRAILING_WINDOW,
            regression_window: DEFAULT_REGRESSION_WINDOW,
            min_movement_value: 0,
            min_movement_sum: None,
        }
    }
}

impl AnalyzerConfig {
    /// Check that both windows hold at least one value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.trailing_window == 0 {
            return Err(ConfigError::Invalid(
                "trailing_window must be at least 1".to_string(),
            ));
        }
        if self.regression_window == 0 {
            return Err(ConfigError::Invalid(
                "regression_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// The most frequent movement value(s).
///
/// Ties are reported in full, smallest value first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mode {
    pub values: Vec<u32>,
    pub occurrences: u64,
}

/// Errors from aggregate queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// The named statistic was requested before any entry was observed
    EmptyAggregateQuery(&'static str),
}

impl std::fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::EmptyAggregateQuery(stat) => {
                write!(f, "Cannot compute {stat}: no entries observed yet")
            }
        }
    }
}

impl std::error::Error for AnalysisError {}

/// Incrementally maintained movement statistics.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalyzerConfig,
    /// Number of entries observed
    observed: u64,
    /// Sum of all movement values
    total: u64,
    max_value: u32,
    occurrences_of: BTreeMap<u32, u64>,
    /// Values currently holding the highest count
    mode_values: BTreeSet<u32>,
    mode_count: u64,
    big_movement_indices: Vec<u64>,
    /// Last W movement values, oldest first
    window: VecDeque<u32>,
    window_sum: u64,
    trailing_sum_series: Vec<u64>,
    decaying_score_series: Vec<u64>,
    trend_coefficients: Vec<f64>,
    /// Entries whose trailing sum exceeded `min_movement_sum`
    sum_alerts: u64,
}

impl Analyzer {
    pub fn new(config: AnalyzerConfig) -> Self {
        Self {
            window: VecDeque::with_capacity(config.trailing_window.min(4096)),
            config,
            observed: 0,
            total: 0,
            max_value: 0,
            occurrences_of: BTreeMap::new(),
            mode_values: BTreeSet::new(),
            mode_count: 0,
            big_movement_indices: Vec::new(),
            window_sum: 0,
            trailing_sum_series: Vec::new(),
            decaying_score_series: vec![0, 0],
            trend_coefficients: Vec::new(),
            sum_alerts: 0,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Fold one entry into every aggregate.
    ///
    /// Must be called exactly once per entry, in append order.
    pub fn observe(&mut self, entry: &Entry) {
        let value = entry.movement_value();

        if self.is_big_movement(value) {
            self.big_movement_indices.push(entry.index());
        }

        self.window.push_back(value);
        self.window_sum += u64::from(value);
        if self.window.len() > self.config.trailing_window {
            if let Some(leaving) = self.window.pop_front() {
                self.window_sum -= u64::from(leaving);
            }
        }
        self.trailing_sum_series.push(self.window_sum);

        if let Some(threshold) = self.config.min_movement_sum {
            if self.window_sum > threshold {
                self.sum_alerts += 1;
                tracing::info!(
                    entry = %entry,
                    trailing_sum = self.window_sum,
                    "Trailing movement sum above threshold"
                );
            }
        }

        let previous = self.decaying_score_series.last().copied().unwrap_or(0);
        let score = (previous + u64::from(value)).saturating_sub(1);
        self.decaying_score_series.push(score);

        let start = self
            .decaying_score_series
            .len()
            .saturating_sub(self.config.regression_window);
        let slope = positional_slope(
            self.decaying_score_series[start..]
                .iter()
                .map(|&score| score as f64),
        );
        self.trend_coefficients.push(slope);

        self.max_value = self.max_value.max(value);
        let count = self.occurrences_of.entry(value).or_insert(0);
        *count += 1;
        let count = *count;
        match count.cmp(&self.mode_count) {
            std::cmp::Ordering::Greater => {
                self.mode_count = count;
                self.mode_values.clear();
                self.mode_values.insert(value);
            }
            std::cmp::Ordering::Equal => {
                self.mode_values.insert(value);
            }
            std::cmp::Ordering::Less => {}
        }

        self.observed += 1;
        self.total += u64::from(value);
    }

    /// Whether `value` passes the big-movement threshold.
    pub fn is_big_movement(&self, value: u32) -> bool {
        value > self.config.min_movement_value
    }

    /// Number of entries observed so far.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    pub fn max_value(&self) -> Result<u32, AnalysisError> {
        if self.observed == 0 {
            return Err(AnalysisError::EmptyAggregateQuery("max"));
        }
        Ok(self.max_value)
    }

    pub fn mode(&self) -> Result<Mode, AnalysisError> {
        if self.observed == 0 {
            return Err(AnalysisError::EmptyAggregateQuery("mode"));
        }
        Ok(Mode {
            values: self.mode_values.iter().copied().collect(),
            occurrences: self.mode_count,
        })
    }

    pub fn mean(&self) -> Result<f64, AnalysisError> {
        if self.observed == 0 {
            return Err(AnalysisError::EmptyAggregateQuery("mean"));
        }
        Ok(self.total as f64 / self.observed as f64)
    }

    /// How many observed entries carried `value`.
    pub fn occurrences_of(&self, value: u32) -> u64 {
        self.occurrences_of.get(&value).copied().unwrap_or(0)
    }

    /// Value histogram, ordered by movement value.
    pub fn histogram(&self) -> &BTreeMap<u32, u64> {
        &self.occurrences_of
    }

    /// Store indices of big movements, in observation order.
    pub fn big_movement_indices(&self) -> &[u64] {
        &self.big_movement_indices
    }

    /// Resolve big movements against the store they were observed from.
    pub fn big_movement_entries<'a>(
        &'a self,
        store: &'a EntryStore,
    ) -> impl Iterator<Item = &'a Entry> + 'a {
        self.big_movement_indices
            .iter()
            .filter_map(move |&index| store.at(index as usize).ok())
    }

    pub fn trailing_sum_series(&self) -> &[u64] {
        &self.trailing_sum_series
    }

    /// Decaying score, including the two leading seed zeros.
    pub fn decaying_score_series(&self) -> &[u64] {
        &self.decaying_score_series
    }

    pub fn trend_coefficients(&self) -> &[f64] {
        &self.trend_coefficients
    }

    /// Number of entries whose trailing sum exceeded `min_movement_sum`.
    pub fn sum_alerts(&self) -> u64 {
        self.sum_alerts
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(AnalyzerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(config: AnalyzerConfig, values: &[u32]) -> (EntryStore, Analyzer) {
        let mut store = EntryStore::new();
        let mut analyzer = Analyzer::new(config);
        for &value in values {
            store.append(Entry::new(value)).unwrap();
            let entry = *store.last().unwrap();
            analyzer.observe(&entry);
        }
        (store, analyzer)
    }

    #[test]
    fn test_empty_queries_fail() {
        let analyzer = Analyzer::default();
        assert_eq!(
            analyzer.mean(),
            Err(AnalysisError::EmptyAggregateQuery("mean"))
        );
        assert!(analyzer.mode().is_err());
        assert!(analyzer.max_value().is_err());
        assert_eq!(analyzer.decaying_score_series(), &[0, 0]);
    }

    #[test]
    fn test_big_movement_threshold() {
        let config = AnalyzerConfig {
            min_movement_value: 4,
            ..Default::default()
        };
        let (store, analyzer) = feed(config, &[0, 5, 10, 2, 8]);

        let values: Vec<u32> = analyzer
            .big_movement_entries(&store)
            .map(Entry::movement_value)
            .collect();
        assert_eq!(values, vec![5, 10, 8]);
        assert_eq!(analyzer.big_movement_indices(), &[1, 2, 4]);
    }

    #[test]
    fn test_default_threshold_keeps_nonzero() {
        let (store, analyzer) = feed(AnalyzerConfig::default(), &[0, 1, 0, 3]);
        assert_eq!(analyzer.big_movement_entries(&store).count(), 2);
    }

    #[test]
    fn test_max_histogram_and_mean() {
        let values = [3, 7, 3, 0, 7, 1];
        let (_, analyzer) = feed(AnalyzerConfig::default(), &values);

        assert_eq!(analyzer.max_value(), Ok(7));
        assert_eq!(analyzer.occurrences_of(3), 2);
        assert_eq!(analyzer.occurrences_of(5), 0);
        assert_eq!(
            analyzer.histogram().values().sum::<u64>(),
            values.len() as u64
        );
        assert!((analyzer.mean().unwrap() - 21.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_mode_reports_all_ties() {
        let (_, analyzer) = feed(AnalyzerConfig::default(), &[3, 7, 3, 0, 7, 1]);
        assert_eq!(
            analyzer.mode(),
            Ok(Mode {
                values: vec![3, 7],
                occurrences: 2
            })
        );

        let (_, analyzer) = feed(AnalyzerConfig::default(), &[3, 7, 3, 0, 7, 1, 7]);
        assert_eq!(
            analyzer.mode(),
            Ok(Mode {
                values: vec![7],
                occurrences: 3
            })
        );
    }

    #[test]
    fn test_trailing_sum_window() {
        let config = AnalyzerConfig {
            trailing_window: 3,
            ..Default::default()
        };
        let values = [1, 2, 3, 4, 5, 6];
        let (_, analyzer) = feed(config, &values);

        assert_eq!(analyzer.trailing_sum_series(), &[1, 3, 6, 9, 12, 15]);
        for k in 0..values.len() {
            let start = (k + 1).saturating_sub(3);
            let expected: u64 = values[start..=k].iter().map(|&v| u64::from(v)).sum();
            assert_eq!(analyzer.trailing_sum_series()[k], expected);
        }
    }

    #[test]
    fn test_decaying_score_floors_at_zero() {
        let (_, analyzer) = feed(AnalyzerConfig::default(), &[0, 3, 0, 0, 0, 0, 5]);
        assert_eq!(
            analyzer.decaying_score_series(),
            &[0, 0, 0, 2, 1, 0, 0, 0, 4]
        );
    }

    #[test]
    fn test_one_derived_value_per_entry() {
        let (_, analyzer) = feed(AnalyzerConfig::default(), &[4, 0, 9, 1]);
        assert_eq!(analyzer.observed(), 4);
        assert_eq!(analyzer.trailing_sum_series().len(), 4);
        assert_eq!(analyzer.trend_coefficients().len(), 4);
        assert_eq!(analyzer.decaying_score_series().len(), 6);
    }

    #[test]
    fn test_trend_of_steady_climb() {
        // Each reading of 2 raises the score by exactly 1.
        let (_, analyzer) = feed(AnalyzerConfig::default(), &[2; 60]);
        let last = *analyzer.trend_coefficients().last().unwrap();
        assert!((last - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_of_silence_is_flat() {
        let (_, analyzer) = feed(AnalyzerConfig::default(), &[1; 60]);
        assert!(analyzer.trend_coefficients().iter().all(|c| c.abs() < 1e-12));
    }

    #[test]
    fn test_config_validation() {
        assert!(AnalyzerConfig::default().validate().is_ok());
        let config = AnalyzerConfig {
            regression_window: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_trailing_sum_alerts() {
        let config = AnalyzerConfig {
            trailing_window: 3,
            min_movement_sum: Some(10),
            ..AnalyzerConfig::default()
        };
        // Trailing sums: 4, 8, 12, 12, 8, 15
        let (_, analyzer) = feed(config, &[4, 4, 4, 4, 0, 11]);
        assert_eq!(analyzer.trailing_sum_series(), &[4, 8, 12, 12, 8, 15]);
        assert_eq!(analyzer.sum_alerts(), 3);

        let (_, quiet) = feed(AnalyzerConfig::default(), &[4, 4, 4, 4, 0, 11]);
        assert_eq!(quiet.sum_alerts(), 0);
    }
}
