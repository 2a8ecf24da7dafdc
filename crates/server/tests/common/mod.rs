//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with a mock search API and a temporary download directory, enabling
//! end-to-end tests without network access or the extraction tool.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use tubefetch_core::{testing::MockSearch, Config, VideoSearch};
use tubefetch_server::state::AppState;

/// Re-export fixtures for test convenience
#[allow(unused_imports)]
pub use tubefetch_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_home_page() {
///     let fixture = TestFixture::new().await;
///     let response = fixture.get("/").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
#[allow(dead_code)]
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Shared state behind the router
    pub state: Arc<AppState>,
    /// Mock search - configure result pages and details
    pub search: Arc<MockSearch>,
    /// Temporary directory holding downloads and static assets
    pub temp_dir: TempDir,
    /// Download directory served under `/downloads`
    pub download_dir: PathBuf,
}

/// Response from a test request
#[derive(Debug)]
#[allow(dead_code)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

#[allow(dead_code)]
impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap_or(Value::Null)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
    }
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let download_dir = temp_dir.path().join("downloads");
        let public_dir = temp_dir.path().join("public");
        std::fs::create_dir_all(&download_dir).expect("Failed to create download dir");
        std::fs::create_dir_all(public_dir.join("js")).expect("Failed to create public dir");
        std::fs::write(public_dir.join("style.css"), "body { margin: 0; }")
            .expect("Failed to write stylesheet");

        let mut config = Config::default();
        config.server.host = std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST);
        config.server.port = 0; // Not used for in-process testing
        config.server.public_dir = public_dir;
        config.downloads.dir = download_dir.clone();
        // No tool is installed; listings fall back and spawns fail
        config.tool.path = temp_dir.path().join("missing-tool");

        let search = Arc::new(MockSearch::new());
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&search) as Arc<dyn VideoSearch>,
        ));
        let router = tubefetch_server::api::create_router(Arc::clone(&state));

        Self {
            router,
            state,
            search,
            temp_dir,
            download_dir,
        }
    }

    /// Put a finished download in place.
    pub fn add_download(&self, filename: &str, contents: &[u8]) {
        std::fs::write(self.download_dir.join(filename), contents)
            .expect("Failed to write download");
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        TestResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&body_bytes).into_owned(),
        }
    }
}
