//! Video search API.
//!
//! The dispatcher only needs three calls from the upstream service; they sit
//! behind [`VideoSearch`] so tests can substitute a mock.

mod innertube;
mod types;

pub use innertube::InnertubeClient;
pub use types::{PageToken, ResultPage, Thumbnail, VideoDetail, VideoItem};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from the search API.
#[derive(Debug, Error)]
pub enum SearchError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Response did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait VideoSearch: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &str;

    /// First page of videos matching `keyword`.
    async fn search_by_keyword(&self, keyword: &str) -> Result<ResultPage, SearchError>;

    /// Page following a previous result.
    async fn next_page(&self, token: &PageToken) -> Result<ResultPage, SearchError>;

    async fn video_details(&self, video_id: &str) -> Result<VideoDetail, SearchError>;
}
