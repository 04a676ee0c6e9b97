//! Integration tests for log upload against a local mock log server

#[cfg(feature = "upload")]
mod upload_tests {
    use axum::{
        body::Bytes,
        extract::{Path, State},
        http::{HeaderMap, StatusCode},
        routing::{get, head},
        Router,
    };
    use sleep_analyzer::upload::{BlockingUploadClient, UploadClient, UploadConfig, UploadError};
    use std::net::SocketAddr;
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    /// A log received by the mock server.
    #[derive(Debug, Clone)]
    struct Received {
        name: String,
        size: usize,
        authorization: Option<String>,
        device_id: Option<String>,
    }

    struct MockState {
        existing: Vec<String>,
        received: Mutex<Vec<Received>>,
    }

    async fn health() -> StatusCode {
        StatusCode::OK
    }

    async fn exists(State(state): State<Arc<MockState>>, Path(name): Path<String>) -> StatusCode {
        if state.existing.contains(&name) {
            StatusCode::OK
        } else {
            StatusCode::NOT_FOUND
        }
    }

    async fn store(
        State(state): State<Arc<MockState>>,
        Path(name): Path<String>,
        headers: HeaderMap,
        body: Bytes,
    ) -> StatusCode {
        let header = |key: &str| {
            headers
                .get(key)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        state.received.lock().unwrap().push(Received {
            name,
            size: body.len(),
            authorization: header("authorization"),
            device_id: header("x-device-id"),
        });
        StatusCode::CREATED
    }

    /// Serve the mock log server on a random port.
    async fn start_mock_server(existing: &[&str]) -> (SocketAddr, Arc<MockState>) {
        let state = Arc::new(MockState {
            existing: existing.iter().map(|s| s.to_string()).collect(),
            received: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/health", get(health))
            .route("/logs/:name", head(exists).put(store))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock server");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (addr, state)
    }

    fn test_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "sleep-analyzer-upload-test-{}",
            uuid::Uuid::new_v4()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn client_for(addr: SocketAddr, token: Option<&str>) -> UploadClient {
        let mut config = UploadConfig::new(format!("http://{addr}"), token.map(String::from));
        config.min_size_bytes = 1_000;
        UploadClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_uploads_only_new_complete_logs() {
        let (addr, state) = start_mock_server(&["existing.slp.csv"]).await;
        let dir = test_dir();
        let big = "x".repeat(1_200);
        std::fs::write(dir.join("new.slp.csv"), &big).unwrap();
        std::fs::write(dir.join("existing.slp.csv"), &big).unwrap();
        std::fs::write(dir.join("short.slp.csv"), "Date,Time,Index,Movement Value\r\n").unwrap();
        std::fs::write(dir.join("notes.txt"), &big).unwrap();

        let client = client_for(addr, Some("secret"));
        assert!(client.test_connection().await.unwrap());

        let report = client.upload_new_logfiles(&dir).await.unwrap();
        assert_eq!(report.uploaded, vec!["new.slp.csv"]);
        assert_eq!(report.skipped_existing, vec!["existing.slp.csv"]);
        assert_eq!(report.skipped_small, vec!["short.slp.csv"]);
        assert!(report.failed.is_empty());

        // Both logs now live on the server only
        assert!(!dir.join("new.slp.csv").exists());
        assert!(!dir.join("existing.slp.csv").exists());
        assert!(dir.join("short.slp.csv").exists());
        assert!(dir.join("notes.txt").exists());

        let received = state.received.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].name, "new.slp.csv");
        assert_eq!(received[0].size, 1_200);
        assert_eq!(received[0].authorization.as_deref(), Some("Bearer secret"));
        assert_eq!(received[0].device_id.as_deref(), Some(client.device_id()));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_second_pass_finds_nothing_to_do() {
        let (addr, state) = start_mock_server(&[]).await;
        let dir = test_dir();
        std::fs::write(dir.join("night.slp.csv"), "x".repeat(2_000)).unwrap();

        let client = client_for(addr, None);
        let first = client.upload_new_logfiles(&dir).await.unwrap();
        assert_eq!(first.uploaded, vec!["night.slp.csv"]);

        let second = client.upload_new_logfiles(&dir).await.unwrap();
        assert!(second.uploaded.is_empty());
        assert!(second.skipped_existing.is_empty());
        assert_eq!(state.received.lock().unwrap().len(), 1);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let dir = test_dir();
        std::fs::write(dir.join("night.slp.csv"), "x".repeat(2_000)).unwrap();

        let result = client_for(addr, None).upload_new_logfiles(&dir).await;
        assert!(matches!(result, Err(UploadError::Network(_))));
        assert!(dir.join("night.slp.csv").exists());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_blocking_client_outside_runtime() {
        let (addr, _state) = start_mock_server(&[]).await;

        // The blocking client owns a runtime, so it runs on a blocking thread
        let healthy = tokio::task::spawn_blocking(move || {
            let client =
                BlockingUploadClient::new(UploadConfig::new(format!("http://{addr}"), None))?;
            client.test_connection()
        })
        .await
        .unwrap()
        .unwrap();

        assert!(healthy);
    }
}
