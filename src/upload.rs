//! Upload of completed session logs to a remote log server.
//!
//! Local `*.slp.csv` files that are large enough to be complete sessions and
//! not yet present on the server are sent with `PUT {endpoint}/logs/{name}`.
//! A local log is deleted once the server holds it, either because the
//! upload was acknowledged or because it was already there.

use crate::config::UploadSettings;
use crate::logfile::LOG_FILE_SUFFIX;
use std::path::{Path, PathBuf};

/// Upload client configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Base URL of the log server
    pub endpoint: String,
    /// Bearer authentication token
    pub token: Option<String>,
    /// Smaller logs are skipped
    pub min_size_bytes: u64,
}

impl UploadConfig {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            token,
            min_size_bytes: UploadSettings::default().min_size_bytes,
        }
    }

    /// Build from the `upload` section of the configuration file.
    pub fn from_settings(settings: &UploadSettings) -> Result<Self, UploadError> {
        let endpoint = settings
            .endpoint
            .clone()
            .ok_or_else(|| UploadError::Config("No upload endpoint configured".to_string()))?;
        Ok(Self {
            endpoint,
            token: settings.token.clone(),
            min_size_bytes: settings.min_size_bytes,
        })
    }

    /// URL of a log file on the server.
    pub fn log_url(&self, file_name: &str) -> String {
        format!("{}/logs/{}", self.endpoint.trim_end_matches('/'), file_name)
    }

    /// Get the health check endpoint URL.
    pub fn health_url(&self) -> String {
        format!("{}/health", self.endpoint.trim_end_matches('/'))
    }
}

/// Upload error types.
#[derive(Debug)]
pub enum UploadError {
    /// Configuration error
    Config(String),
    /// Network/HTTP error
    Network(String),
    /// Server returned an error response
    Server { status: u16, message: String },
    /// Local file error
    Io(String),
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadError::Config(msg) => write!(f, "Upload config error: {msg}"),
            UploadError::Network(msg) => write!(f, "Upload network error: {msg}"),
            UploadError::Server { status, message } => {
                write!(f, "Upload server error ({status}): {message}")
            }
            UploadError::Io(msg) => write!(f, "Upload IO error: {msg}"),
        }
    }
}

impl std::error::Error for UploadError {}

/// Outcome of one upload pass.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub uploaded: Vec<String>,
    pub skipped_small: Vec<String>,
    pub skipped_existing: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl std::fmt::Display for UploadReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "uploaded: {}, already on server: {}, too small: {}, failed: {}",
            self.uploaded.len(),
            self.skipped_existing.len(),
            self.skipped_small.len(),
            self.failed.len()
        )
    }
}

/// Session logs in `dir`, sorted by name.
pub fn local_logfiles(dir: &Path) -> Result<Vec<PathBuf>, UploadError> {
    let mut logs: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| UploadError::Io(format!("{}: {e}", dir.display())))?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(LOG_FILE_SUFFIX))
                .unwrap_or(false)
        })
        .collect();
    logs.sort();
    Ok(logs)
}

/// Delete a local log once the server holds a copy.
fn remove_local(path: &Path, file_name: &str) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("{file_name} is on the server but could not be removed locally: {e}");
    }
}

/// Async upload client.
pub struct UploadClient {
    config: UploadConfig,
    client: reqwest::Client,
    device_id: String,
}

impl UploadClient {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| UploadError::Config(format!("Failed to create HTTP client: {e}")))?;

        let hostname = hostname::get()
            .map(|h| h.to_string_lossy().to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let device_id = format!("analyzer-{hostname}");

        Ok(Self {
            config,
            client,
            device_id,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header("X-Device-Id", &self.device_id);
        match self.config.token {
            Some(ref token) => request.header("Authorization", format!("Bearer {token}")),
            None => request,
        }
    }

    /// Test connection to the log server.
    pub async fn test_connection(&self) -> Result<bool, UploadError> {
        let response = self
            .authorized(self.client.get(self.config.health_url()))
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        Ok(response.status().is_success())
    }

    /// Whether the server already holds a log with this name.
    pub async fn exists_remotely(&self, file_name: &str) -> Result<bool, UploadError> {
        let response = self
            .authorized(self.client.head(self.config.log_url(file_name)))
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(true)
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Ok(false)
        } else {
            Err(UploadError::Server {
                status: status.as_u16(),
                message: "unexpected response to existence check".to_string(),
            })
        }
    }

    /// Send one log file.
    pub async fn upload_file(&self, path: &Path, file_name: &str) -> Result<(), UploadError> {
        let body = std::fs::read(path).map_err(|e| UploadError::Io(e.to_string()))?;

        let response = self
            .authorized(self.client.put(self.config.log_url(file_name)))
            .header("Content-Type", "text/csv")
            .body(body)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(UploadError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    /// Upload every complete local log not yet on the server.
    ///
    /// Logs the server already holds are removed locally without a re-upload.
    pub async fn upload_new_logfiles(&self, dir: &Path) -> Result<UploadReport, UploadError> {
        let mut report = UploadReport::default();
        let logs = local_logfiles(dir)?;
        tracing::info!("Found {} local logfile(s) in {}", logs.len(), dir.display());

        for path in logs {
            let file_name = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };

            let size = std::fs::metadata(&path)
                .map_err(|e| UploadError::Io(e.to_string()))?
                .len();
            if size < self.config.min_size_bytes {
                tracing::info!(
                    "Skipping {file_name}: log is < {} bytes",
                    self.config.min_size_bytes
                );
                report.skipped_small.push(file_name);
                continue;
            }

            if self.exists_remotely(&file_name).await? {
                tracing::info!("Skipping {file_name}: log is already on server");
                remove_local(&path, &file_name);
                report.skipped_existing.push(file_name);
                continue;
            }

            tracing::info!("Uploading {file_name}");
            match self.upload_file(&path, &file_name).await {
                Ok(()) => {
                    remove_local(&path, &file_name);
                    report.uploaded.push(file_name);
                }
                Err(e) => {
                    tracing::warn!("Upload of {file_name} failed: {e}");
                    report.failed.push((file_name, e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Get the device ID.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

/// Blocking upload client for use in synchronous contexts.
pub struct BlockingUploadClient {
    inner: UploadClient,
    runtime: tokio::runtime::Runtime,
}

impl BlockingUploadClient {
    pub fn new(config: UploadConfig) -> Result<Self, UploadError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| UploadError::Config(format!("Failed to create runtime: {e}")))?;

        Ok(Self {
            inner: UploadClient::new(config)?,
            runtime,
        })
    }

    pub fn test_connection(&self) -> Result<bool, UploadError> {
        self.runtime.block_on(self.inner.test_connection())
    }

    pub fn upload_new_logfiles(&self, dir: &Path) -> Result<UploadReport, UploadError> {
        self.runtime.block_on(self.inner.upload_new_logfiles(dir))
    }

    pub fn device_id(&self) -> &str {
        self.inner.device_id()
    }
}
