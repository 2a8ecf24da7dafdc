//! Testing utilities and mock implementations.
//!
//! This module provides a mock search API, a scripted stand-in for the
//! extraction tool, and fixtures, so the dispatcher and job manager can be
//! exercised without network access or the real tool.
//!
//! # Example
//!
//! ```rust,ignore
//! use tubefetch_core::testing::{fixtures, FakeTool, MockSearch};
//!
//! let search = MockSearch::new();
//! search.add_detail("abc", fixtures::video_detail("Cats")).await;
//!
//! let tool = FakeTool::new(scripts.path()).exit_code(1).install()?;
//! ```

#[cfg(unix)]
mod fake_tool;
mod mock_search;

#[cfg(unix)]
pub use fake_tool::{FakeTool, SAMPLE_LISTING};
pub use mock_search::{MockSearch, RecordedSearchCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;

    use crate::app::{Dispatcher, DownloadPanelView};
    use crate::cache::ArtifactRegistry;
    use crate::config::{SiteConfig, ToolConfig};
    use crate::job::{JobManager, JobView};
    use crate::search::{PageToken, ResultPage, Thumbnail, VideoDetail, VideoItem, VideoSearch};
    use crate::session::SessionRegistry;

    /// Create a video item with a thumbnail.
    pub fn video_item(id: &str, title: &str) -> VideoItem {
        VideoItem {
            id: id.to_string(),
            title: title.to_string(),
            thumbnail: Some(Thumbnail {
                url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id),
                width: 360,
                height: 202,
            }),
        }
    }

    /// Create a result page of items titled after their ids.
    pub fn result_page(ids: &[&str], next: Option<&str>) -> ResultPage {
        ResultPage {
            items: ids
                .iter()
                .map(|id| video_item(id, &format!("Video {}", id)))
                .collect(),
            next_page: next.map(|token| PageToken(token.to_string())),
        }
    }

    pub fn video_detail(title: &str) -> VideoDetail {
        VideoDetail {
            title: title.to_string(),
            description: Some(format!("About {}", title.to_lowercase())),
            channel: "Test Channel".to_string(),
            is_live: false,
        }
    }

    /// Everything a dispatcher needs, wired together.
    pub struct TestApp {
        pub sessions: SessionRegistry,
        pub artifacts: ArtifactRegistry,
        pub jobs: Arc<JobManager>,
        pub dispatcher: Arc<Dispatcher>,
    }

    /// Wire a dispatcher over `download_dir` using `tool_path` as the tool.
    pub fn test_app(
        download_dir: &Path,
        tool_path: &Path,
        search: Arc<dyn VideoSearch>,
        artifact_ttl: Duration,
    ) -> TestApp {
        let sessions = SessionRegistry::new();
        let artifacts = ArtifactRegistry::new(download_dir, artifact_ttl);
        let tool = ToolConfig {
            path: tool_path.to_path_buf(),
            ..ToolConfig::default()
        };
        let view: Arc<dyn JobView> = Arc::new(DownloadPanelView);
        let jobs = Arc::new(JobManager::new(
            tool,
            artifacts.clone(),
            sessions.clone(),
            view,
        ));
        let dispatcher = Arc::new(Dispatcher::new(
            SiteConfig::default(),
            search,
            Arc::clone(&jobs),
            sessions.clone(),
            Duration::from_secs(60),
        ));

        TestApp {
            sessions,
            artifacts,
            jobs,
            dispatcher,
        }
    }
}
