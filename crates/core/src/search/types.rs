use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thumbnail {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

/// One video in a result page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoItem {
    pub id: String,
    pub title: String,
    pub thumbnail: Option<Thumbnail>,
}

/// Opaque continuation handed back to [`super::VideoSearch::next_page`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageToken(pub String);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPage {
    pub items: Vec<VideoItem>,
    pub next_page: Option<PageToken>,
}

/// Title and description shown above format tables and download panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDetail {
    pub title: String,
    pub description: Option<String>,
    pub channel: String,
    pub is_live: bool,
}

impl VideoDetail {
    /// Stand-in used when the details lookup fails: the id doubles as title.
    pub fn placeholder(video_id: &str) -> Self {
        Self {
            title: video_id.to_string(),
            description: None,
            channel: String::new(),
            is_live: false,
        }
    }
}
