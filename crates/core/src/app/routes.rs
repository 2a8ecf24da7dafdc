//! URL matching for page routes.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::HashMap;

/// A matched page route with its decoded parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Search {
        keyword: Option<String>,
        url: Option<String>,
    },
    MoreResults {
        id: String,
    },
    Video {
        id: String,
    },
    Download {
        video_id: String,
        format_id: String,
    },
    NotFound,
}

impl Route {
    pub fn parse(url: &str) -> Route {
        let (path, query) = split_url(url);
        let segments: Vec<String> = path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(decode_segment)
            .collect();

        match segments.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
            [] => Route::Home,
            ["search"] => {
                let params = parse_query(query);
                Route::Search {
                    keyword: non_empty(params.get("q")),
                    url: non_empty(params.get("url")),
                }
            }
            ["more-result", id] => Route::MoreResults {
                id: id.to_string(),
            },
            ["video", id] => Route::Video { id: id.to_string() },
            ["download", video_id, format_id] => Route::Download {
                video_id: video_id.to_string(),
                format_id: format_id.to_string(),
            },
            _ => Route::NotFound,
        }
    }

    /// Name used in logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Route::Home => "home",
            Route::Search { .. } => "search",
            Route::MoreResults { .. } => "more_results",
            Route::Video { .. } => "video",
            Route::Download { .. } => "download",
            Route::NotFound => "not_found",
        }
    }
}

fn split_url(url: &str) -> (&str, &str) {
    let url = url.split('#').next().unwrap_or(url);
    match url.split_once('?') {
        Some((path, query)) => (path, query),
        None => (url, ""),
    }
}

fn decode_segment(segment: &str) -> String {
    match urlencoding::decode(segment) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => segment.to_string(),
    }
}

/// Query components also use `+` for spaces.
fn decode(component: &str) -> String {
    decode_segment(&component.replace('+', " "))
}

pub fn parse_query(query: &str) -> HashMap<String, String> {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((key, value)) => (decode(key), decode(value)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

static VIDEO_URL_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:[?&]v=|youtu\.be/|/shorts/|/embed/)([A-Za-z0-9_-]+)").unwrap()
});

/// Extract a video id from a pasted watch URL, or treat the input as an id.
pub fn video_id_from_input(input: &str) -> String {
    let input = input.trim();
    VIDEO_URL_ID
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| input.to_string())
}

pub fn video_href(video_id: &str) -> String {
    format!("/video/{}", urlencoding::encode(video_id))
}

pub fn download_href(video_id: &str, format_id: &str) -> String {
    format!(
        "/download/{}/{}",
        urlencoding::encode(video_id),
        urlencoding::encode(format_id)
    )
}

pub fn more_results_href(id: u64) -> String {
    format!("/more-result/{}", id)
}

pub fn artifact_href(filename: &str) -> String {
    format!("/downloads/{}", urlencoding::encode(filename))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_static_and_param_routes() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(
            Route::parse("/video/abc"),
            Route::Video {
                id: "abc".to_string()
            }
        );
        assert_eq!(
            Route::parse("/download/abc/137%2B140"),
            Route::Download {
                video_id: "abc".to_string(),
                format_id: "137+140".to_string(),
            }
        );
        assert_eq!(
            Route::parse("/more-result/3"),
            Route::MoreResults {
                id: "3".to_string()
            }
        );
        assert_eq!(Route::parse("/video"), Route::NotFound);
        assert_eq!(Route::parse("/nope/a/b/c"), Route::NotFound);
    }

    #[test]
    fn test_parse_search_query() {
        assert_eq!(
            Route::parse("/search?q=funny+cats&url="),
            Route::Search {
                keyword: Some("funny cats".to_string()),
                url: None,
            }
        );
        assert_eq!(
            Route::parse("/search?url=https%3A%2F%2Fwww.youtube.com%2Fwatch%3Fv%3Dabc"),
            Route::Search {
                keyword: None,
                url: Some("https://www.youtube.com/watch?v=abc".to_string()),
            }
        );
        assert_eq!(
            Route::parse("/search?q=%20%20"),
            Route::Search {
                keyword: None,
                url: None,
            }
        );
    }

    #[test]
    fn test_video_id_from_input() {
        assert_eq!(
            video_id_from_input("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=10"),
            "dQw4w9WgXcQ"
        );
        assert_eq!(video_id_from_input("https://youtu.be/dQw4w9WgXcQ"), "dQw4w9WgXcQ");
        assert_eq!(video_id_from_input("  dQw4w9WgXcQ "), "dQw4w9WgXcQ");
    }

    #[test]
    fn test_hrefs_are_encoded() {
        assert_eq!(download_href("abc", "137+140"), "/download/abc/137%2B140");
        assert_eq!(artifact_href("My Video [abc].mp4"), "/downloads/My%20Video%20%5Babc%5D.mp4");
    }
}
