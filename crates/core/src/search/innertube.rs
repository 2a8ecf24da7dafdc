//! Client for YouTube's internal web API ("innertube").
//!
//! No API key is needed; requests carry a web client context instead.
//! Responses are deeply nested renderer trees, so results are located by
//! walking the JSON rather than through fixed structs.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::types::{PageToken, ResultPage, Thumbnail, VideoDetail, VideoItem};
use super::{SearchError, VideoSearch};
use crate::config::SearchConfig;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

/// Search filter restricting results to videos.
const VIDEOS_ONLY_PARAMS: &str = "EgIQAQ==";

pub struct InnertubeClient {
    client: Client,
    base_url: String,
    client_version: String,
}

impl InnertubeClient {
    pub fn new(config: &SearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_version: config.client_version.clone(),
        })
    }

    fn context(&self) -> Value {
        json!({
            "client": {
                "clientName": "WEB",
                "clientVersion": self.client_version,
                "hl": "en",
            }
        })
    }

    async fn post(&self, operation: &str, endpoint: &str, body: Value) -> Result<Value, SearchError> {
        let url = format!("{}/{}?prettyPrint=false", self.base_url, endpoint);
        let start = Instant::now();

        let result = self.send(&url, body).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&["search", operation])
            .observe(start.elapsed().as_secs_f64());
        let label = if result.is_ok() { "success" } else { "error" };
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&["search", operation, label])
            .inc();

        result
    }

    async fn send(&self, url: &str, body: Value) -> Result<Value, SearchError> {
        let response = self.client.post(url).json(&body).send().await?;

        let status = response.status();
        if status == 404 {
            return Err(SearchError::NotFound(url.to_string()));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| SearchError::ParseError(format!("Failed to parse response body: {}", e)))
    }
}

#[async_trait]
impl VideoSearch for InnertubeClient {
    fn name(&self) -> &str {
        "innertube"
    }

    async fn search_by_keyword(&self, keyword: &str) -> Result<ResultPage, SearchError> {
        debug!("Innertube search: keyword='{}'", keyword);
        let body = json!({
            "context": self.context(),
            "query": keyword,
            "params": VIDEOS_ONLY_PARAMS,
        });
        let response = self.post("search", "search", body).await?;
        Ok(parse_result_page(&response))
    }

    async fn next_page(&self, token: &PageToken) -> Result<ResultPage, SearchError> {
        debug!("Innertube next page");
        let body = json!({
            "context": self.context(),
            "continuation": token.0,
        });
        let response = self.post("next_page", "search", body).await?;
        Ok(parse_result_page(&response))
    }

    async fn video_details(&self, video_id: &str) -> Result<VideoDetail, SearchError> {
        debug!("Innertube video details: id={}", video_id);
        let body = json!({
            "context": self.context(),
            "videoId": video_id,
        });
        let response = self.post("video_details", "player", body).await?;
        parse_video_detail(&response)
            .ok_or_else(|| SearchError::NotFound(format!("Video {}", video_id)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PlayerVideoDetails {
    title: String,
    #[serde(default)]
    short_description: Option<String>,
    #[serde(default)]
    author: String,
    #[serde(default)]
    is_live_content: bool,
}

fn parse_video_detail(response: &Value) -> Option<VideoDetail> {
    let details: PlayerVideoDetails =
        serde_json::from_value(response.get("videoDetails")?.clone()).ok()?;
    Some(VideoDetail {
        title: details.title,
        description: details.short_description.filter(|d| !d.is_empty()),
        channel: details.author,
        is_live: details.is_live_content,
    })
}

/// Collect every `videoRenderer` and the last continuation token in the tree.
fn parse_result_page(response: &Value) -> ResultPage {
    let mut page = ResultPage::default();
    walk(response, &mut page);
    page
}

fn walk(value: &Value, page: &mut ResultPage) {
    match value {
        Value::Object(map) => {
            if let Some(renderer) = map.get("videoRenderer") {
                if let Some(item) = parse_video_renderer(renderer) {
                    page.items.push(item);
                }
                return;
            }
            if let Some(token) = map
                .get("continuationCommand")
                .and_then(|c| c.get("token"))
                .and_then(Value::as_str)
            {
                page.next_page = Some(PageToken(token.to_string()));
            }
            for child in map.values() {
                walk(child, page);
            }
        }
        Value::Array(items) => {
            for child in items {
                walk(child, page);
            }
        }
        _ => {}
    }
}

fn parse_video_renderer(renderer: &Value) -> Option<VideoItem> {
    let id = renderer.get("videoId")?.as_str()?.to_string();
    let title = renderer
        .pointer("/title/runs/0/text")
        .or_else(|| renderer.pointer("/title/simpleText"))
        .and_then(Value::as_str)
        .unwrap_or(id.as_str())
        .to_string();
    let thumbnail = renderer
        .pointer("/thumbnail/thumbnails/0")
        .and_then(|t| serde_json::from_value::<Thumbnail>(t.clone()).ok());

    Some(VideoItem {
        id,
        title,
        thumbnail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_response() -> Value {
        json!({
            "contents": {
                "twoColumnSearchResultsRenderer": {
                    "primaryContents": {
                        "sectionListRenderer": {
                            "contents": [
                                {
                                    "itemSectionRenderer": {
                                        "contents": [
                                            {
                                                "videoRenderer": {
                                                    "videoId": "abc",
                                                    "title": {"runs": [{"text": "Cats"}]},
                                                    "thumbnail": {"thumbnails": [
                                                        {"url": "https://i.ytimg.com/abc.jpg", "width": 360, "height": 202}
                                                    ]}
                                                }
                                            },
                                            {"shelfRenderer": {"title": {"simpleText": "ignored"}}},
                                            {
                                                "videoRenderer": {
                                                    "videoId": "def",
                                                    "title": {"simpleText": "Dogs"}
                                                }
                                            }
                                        ]
                                    }
                                },
                                {
                                    "continuationItemRenderer": {
                                        "continuationEndpoint": {
                                            "continuationCommand": {"token": "NEXT-1"}
                                        }
                                    }
                                }
                            ]
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_parse_result_page() {
        let page = parse_result_page(&search_response());
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "abc");
        assert_eq!(page.items[0].title, "Cats");
        assert_eq!(
            page.items[0].thumbnail,
            Some(Thumbnail {
                url: "https://i.ytimg.com/abc.jpg".to_string(),
                width: 360,
                height: 202,
            })
        );
        assert_eq!(page.items[1].title, "Dogs");
        assert!(page.items[1].thumbnail.is_none());
        assert_eq!(page.next_page, Some(PageToken("NEXT-1".to_string())));
    }

    #[test]
    fn test_parse_empty_page() {
        let page = parse_result_page(&json!({"estimatedResults": "0"}));
        assert!(page.items.is_empty());
        assert!(page.next_page.is_none());
    }

    #[test]
    fn test_parse_video_detail() {
        let response = json!({
            "videoDetails": {
                "videoId": "abc",
                "title": "Cats",
                "shortDescription": "",
                "author": "Cat Channel",
                "isLiveContent": false
            }
        });
        let detail = parse_video_detail(&response).unwrap();
        assert_eq!(detail.title, "Cats");
        assert_eq!(detail.description, None);
        assert_eq!(detail.channel, "Cat Channel");

        assert!(parse_video_detail(&json!({"playabilityStatus": {}})).is_none());
    }
}
