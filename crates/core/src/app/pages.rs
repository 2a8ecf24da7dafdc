//! Page trees for every route.

use crate::job::{Format, JobContext, JobFailure, JobView, DOWNLOAD_PANEL_SELECTOR};
use crate::render::{el, fragment, raw, Node};
use crate::search::{ResultPage, VideoDetail};

use super::routes::{artifact_href, download_href, more_results_href, video_href};

/// Id of the element replaced on channel navigation.
pub const APP_ID: &str = "app";

fn style(css: &'static str) -> Node {
    el("style").child(raw(css)).into()
}

fn link(href: impl Into<String>, body: impl Into<Node>) -> Node {
    el("a").attr("href", href).child(body).into()
}

const APP_STYLE: &str = "\
#app { font-family: sans-serif; }
#app h1.title a { color: inherit; text-decoration: none; }
#app p.error { color: #c00; }
";

/// Wraps a page body in the application frame.
pub fn app_shell(site_name: &str, main: Node) -> Node {
    el("div")
        .id(APP_ID)
        .child(style(APP_STYLE))
        .child(el("h1").class("title").child(link("/", site_name.to_string())))
        .child(el("fieldset").child(main))
        .child(Node::Flush)
        .into()
}

const HOME_STYLE: &str = "\
#home form { width: fit-content; }
#home form hr { border-color: #0005; }
label.field { display: block; margin: 0.25rem 0; }
label.field input { display: block; margin-top: 0.25rem; }
.or-line { display: flex; gap: 0.5rem; align-items: center; }
.or-line hr { height: 0; width: 100%; }
";

pub fn home() -> Node {
    let field = |label: &str, name: &str| -> Node {
        el("label")
            .class("field")
            .child(format!("{}:", label))
            .child(el("input").attr("type", "text").attr("name", name))
            .into()
    };

    el("div")
        .id("home")
        .child(style(HOME_STYLE))
        .child(el("h2").child("Search Videos"))
        .child(
            el("form")
                .attr("method", "get")
                .attr("action", "/search")
                .child(field("Keywords", "q"))
                .child(
                    el("div")
                        .class("or-line")
                        .child(el("hr"))
                        .child("or")
                        .child(el("hr")),
                )
                .child(field("Url / ID", "url"))
                .child(el("hr"))
                .child(
                    el("input")
                        .attr("type", "submit")
                        .attr("value", "Search")
                        .attr("style", "margin: 0.5rem 0"),
                ),
        )
        .into()
}

const RESULTS_STYLE: &str = "\
#results .video-list { display: flex; flex-direction: column; width: fit-content; max-width: calc(360px + 1rem); }
#results .video-item { border: 1px solid black; padding: 0.5rem; }
#results .video-item img { max-width: 100%; max-height: 100%; object-fit: contain; }
";

/// One page of search results. `more_id` keys the stored continuation.
pub fn search_results(keyword: &str, page: &ResultPage, more_id: Option<u64>) -> Node {
    let items = page.items.iter().map(|video| {
        let thumbnail = video.thumbnail.as_ref().map(|t| {
            el("img")
                .attr("loading", "lazy")
                .attr("width", format!("{}px", t.width))
                .attr("height", format!("{}px", t.height))
                .attr("src", t.url.clone())
        });
        el("a")
            .class("video-item")
            .attr("href", video_href(&video.id))
            .child(el("div").class("video-thumbnail").child(thumbnail))
            .child(el("div").class("video-title").child(video.title.clone()))
    });

    let more = match more_id {
        Some(id) => Node::from(el("p").child(link(more_results_href(id), "Show more result"))),
        None => Node::Empty,
    };

    el("div")
        .id("results")
        .child(style(RESULTS_STYLE))
        .child(el("h2").child(format!("Search Result of \"{}\"", keyword)))
        .child(el("div").class("video-list").children(items))
        .child(if page.items.is_empty() {
            Node::from(el("p").child("No videos found."))
        } else {
            Node::Empty
        })
        .child(more)
        .into()
}

const VIDEO_STYLE: &str = "\
#videoPage table { border-collapse: collapse; }
#videoPage th, #videoPage td { border: 1px solid black; padding: 0.25rem; }
";

fn heading(detail: &VideoDetail) -> Node {
    fragment(vec![
        Node::from(el("h2").child(detail.title.clone())),
        Node::from(el("p").child(detail.description.clone())),
    ])
}

/// Format table for a video that has not been downloaded yet.
///
/// Streaming-only formats are never offered.
pub fn video_page(video_id: &str, detail: &VideoDetail, formats: &[Format]) -> Node {
    let formats: Vec<&Format> = formats.iter().filter(|f| !f.is_streaming()).collect();

    let header = el("tr").children(
        ["id", "ext", "resolution", "fps/ch", "file size", "remark", "action"]
            .into_iter()
            .map(|name| el("th").child(name)),
    );
    let rows = formats.iter().map(|format| {
        el("tr")
            .child(el("td").child(format.id.clone()))
            .child(el("td").child(format.ext.clone()))
            .child(el("td").child(format.resolution.clone()))
            .child(el("td").child(format.fps.clone()))
            .child(el("td").child(format.file_size.clone()))
            .child(el("td").child(format.remark.label()))
            .child(el("td").child(link(
                download_href(video_id, &format.id),
                el("button").child("Download"),
            )))
    });

    el("div")
        .id("videoPage")
        .child(style(VIDEO_STYLE))
        .child(heading(detail))
        .child(
            el("table")
                .child(el("thead").child(header))
                .child(el("tbody").children(rows)),
        )
        .child(if formats.is_empty() {
            Node::from(el("p").child("No formats are available at the moment."))
        } else {
            Node::Empty
        })
        .into()
}

/// State of the download panel.
#[derive(Debug, Clone)]
pub enum DownloadState {
    Loading,
    Ready { filename: String },
    Failed { reason: String, retry_href: String },
}

/// The panel replaced in place when a job finishes.
pub fn download_panel(detail: &VideoDetail, state: &DownloadState) -> Node {
    let body = match state {
        DownloadState::Loading => fragment(vec![
            Node::from(el("p").child("loading video...")),
            Node::from(el("p").id("downloadProgress")),
        ]),
        DownloadState::Ready { filename } => {
            let href = artifact_href(filename);
            fragment(vec![
                Node::from(el("p").child(format!("Video ready: {}", filename))),
                Node::from(
                    el("p").child(
                        el("a")
                            .attr("href", href.clone())
                            .attr("download", filename.clone())
                            .child("Download"),
                    ),
                ),
                Node::from(el("p").child(link(href, "View"))),
            ])
        }
        DownloadState::Failed { reason, retry_href } => fragment(vec![
            Node::from(
                el("p")
                    .class("error")
                    .child(format!("Download failed: {}", reason)),
            ),
            Node::from(el("p").child(link(retry_href.clone(), "Retry"))),
        ]),
    };

    el("div")
        .id(DOWNLOAD_PANEL_SELECTOR.trim_start_matches('#'))
        .child(heading(detail))
        .child(body)
        .into()
}

pub fn not_found(url: &str) -> Node {
    el("div")
        .id("notFound")
        .child(el("h2").child("404 Page Not Found"))
        .child(el("p").child(format!("No page matches {}", url)))
        .child(el("p").child(link("/", "Back to search")))
        .into()
}

/// Inline message for a failed upstream call.
pub fn error_message(error: &dyn std::fmt::Display) -> Node {
    el("p").class("error").child(error.to_string()).into()
}

/// Download panel renderer handed to the job manager.
#[derive(Debug, Default, Clone, Copy)]
pub struct DownloadPanelView;

impl JobView for DownloadPanelView {
    fn completed(&self, job: &JobContext, filename: &str) -> Node {
        download_panel(
            &job.detail,
            &DownloadState::Ready {
                filename: filename.to_string(),
            },
        )
    }

    fn failed(&self, job: &JobContext, failure: &JobFailure) -> Node {
        download_panel(
            &job.detail,
            &DownloadState::Failed {
                reason: failure.to_string(),
                retry_href: download_href(&job.target, &job.format_id),
            },
        )
    }
}
