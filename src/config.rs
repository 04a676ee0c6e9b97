//! Configuration for the sleep analyzer.

use crate::core::analyzer::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Window sizes and thresholds for the analyzer
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// Directory for session log files
    pub log_dir: PathBuf,

    /// Path for telemetry and session summaries
    pub data_path: PathBuf,

    /// Readings buffered between the device reader and the analyzer
    pub channel_capacity: usize,

    /// Remote upload of completed logs
    #[serde(default)]
    pub upload: UploadSettings,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sleep-analyzer");

        Self {
            analyzer: AnalyzerConfig::default(),
            log_dir: data_dir.join("logs"),
            data_path: data_dir,
            channel_capacity: crate::source::DEFAULT_CHANNEL_CAPACITY,
            upload: UploadSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            Self::from_json(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate configuration from JSON text.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sleep-analyzer")
            .join("config.json")
    }

    /// Directory for exported session summaries.
    pub fn summary_dir(&self) -> PathBuf {
        self.data_path.join("summaries")
    }

    /// Path of the persisted telemetry counters.
    pub fn telemetry_path(&self) -> PathBuf {
        self.data_path.join("telemetry.json")
    }

    /// Reject settings the analyzer cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyzer.validate()?;
        if self.channel_capacity == 0 {
            return Err(ConfigError::Invalid(
                "channel_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Ensure all required directories exist.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.log_dir).map_err(|e| ConfigError::IoError(e.to_string()))?;
        std::fs::create_dir_all(&self.data_path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Ok(())
    }
}

/// Settings for uploading completed logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Base URL of the log server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Bearer token sent with every request
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    /// Logs smaller than this are considered incomplete and kept local
    pub min_size_bytes: u64,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            token: None,
            min_size_bytes: 1_000_000,
        }
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analyzer.trailing_window, 1000);
        assert_eq!(config.analyzer.regression_window, 50);
        assert_eq!(config.analyzer.min_movement_value, 0);
        assert_eq!(config.upload.min_size_bytes, 1_000_000);
        assert!(config.log_dir.starts_with(&config.data_path));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_json_round_trip() {
        let mut config = Config::default();
        config.analyzer.trailing_window = 50;
        config.analyzer.min_movement_sum = Some(200);

        let json = serde_json::to_string(&config).unwrap();
        let parsed = Config::from_json(&json).unwrap();
        assert_eq!(parsed.analyzer, config.analyzer);
        assert_eq!(parsed.log_dir, config.log_dir);
    }

    #[test]
    fn test_rejects_zero_window() {
        let json = r#"{
            "analyzer": {"trailing_window": 0, "regression_window": 50, "min_movement_value": 0},
            "log_dir": "logs",
            "data_path": ".",
            "channel_capacity": 10
        }"#;
        assert!(matches!(
            Config::from_json(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let json = r#"{"log_dir": "logs", "data_path": ".", "channel_capacity": 10}"#;
        let config = Config::from_json(json).unwrap();
        assert_eq!(config.analyzer, AnalyzerConfig::default());
        assert!(config.upload.endpoint.is_none());
    }
}
