//! Mock video search for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::search::{PageToken, ResultPage, SearchError, VideoDetail, VideoSearch};

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedSearchCall {
    Keyword(String),
    NextPage(PageToken),
    Details(String),
}

/// Mock implementation of the VideoSearch trait.
///
/// Provides controllable behavior for testing:
/// - Return configurable result pages and details
/// - Track calls for assertions
/// - Simulate failures
///
/// # Example
///
/// ```rust,ignore
/// use tubefetch_core::testing::{fixtures, MockSearch};
///
/// let search = MockSearch::new();
/// search.set_keyword_page(fixtures::result_page(&["abc", "def"], Some("next"))).await;
/// search.add_page("next", fixtures::result_page(&["ghi"], None)).await;
///
/// let page = search.search_by_keyword("cats").await?;
/// assert_eq!(page.items.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockSearch {
    /// Page returned for any keyword.
    keyword_page: Arc<RwLock<ResultPage>>,
    /// Pages returned for continuation tokens.
    pages: Arc<RwLock<HashMap<PageToken, ResultPage>>>,
    /// Details by video id. Unknown ids are not found.
    details: Arc<RwLock<HashMap<String, VideoDetail>>>,
    /// Recorded calls.
    calls: Arc<RwLock<Vec<RecordedSearchCall>>>,
    /// If set, the next call will fail with this error.
    next_error: Arc<RwLock<Option<SearchError>>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the page returned by keyword searches.
    pub async fn set_keyword_page(&self, page: ResultPage) {
        *self.keyword_page.write().await = page;
    }

    /// Register the page returned for a continuation token.
    pub async fn add_page(&self, token: &str, page: ResultPage) {
        self.pages
            .write()
            .await
            .insert(PageToken(token.to_string()), page);
    }

    pub async fn add_detail(&self, video_id: &str, detail: VideoDetail) {
        self.details
            .write()
            .await
            .insert(video_id.to_string(), detail);
    }

    /// Configure the next call to fail with the given error.
    pub async fn set_next_error(&self, error: SearchError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn recorded_calls(&self) -> Vec<RecordedSearchCall> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    async fn record(&self, call: RecordedSearchCall) -> Result<(), SearchError> {
        self.calls.write().await.push(call);
        match self.next_error.write().await.take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VideoSearch for MockSearch {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search_by_keyword(&self, keyword: &str) -> Result<ResultPage, SearchError> {
        self.record(RecordedSearchCall::Keyword(keyword.to_string()))
            .await?;
        Ok(self.keyword_page.read().await.clone())
    }

    async fn next_page(&self, token: &PageToken) -> Result<ResultPage, SearchError> {
        self.record(RecordedSearchCall::NextPage(token.clone())).await?;
        self.pages
            .read()
            .await
            .get(token)
            .cloned()
            .ok_or_else(|| SearchError::NotFound(format!("page {}", token.0)))
    }

    async fn video_details(&self, video_id: &str) -> Result<VideoDetail, SearchError> {
        self.record(RecordedSearchCall::Details(video_id.to_string()))
            .await?;
        self.details
            .read()
            .await
            .get(video_id)
            .cloned()
            .ok_or_else(|| SearchError::NotFound(format!("Video {}", video_id)))
    }
}
