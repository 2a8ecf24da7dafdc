use crate::render::Node;
use crate::search::VideoDetail;

use super::types::JobFailure;

/// What a job needs to know to describe itself to viewers.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub target: String,
    pub format_id: String,
    pub detail: VideoDetail,
}

/// Renders the download panel pushed to viewers when a job ends.
///
/// Both views must be rooted at the element the panel replaces
/// ([`super::DOWNLOAD_PANEL_SELECTOR`]).
pub trait JobView: Send + Sync {
    fn completed(&self, job: &JobContext, filename: &str) -> Node;

    fn failed(&self, job: &JobContext, failure: &JobFailure) -> Node;
}
