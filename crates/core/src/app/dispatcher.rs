//! Resolves URLs to pages and answers push-channel messages.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use super::pages::{self, DownloadState, APP_ID};
use super::routes::{video_href, video_id_from_input, Route};
use crate::cache::ExpiringCache;
use crate::config::SiteConfig;
use crate::job::{is_valid_target, JobManager, JobRequest, JobStart};
use crate::metrics::RENDERS;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::render::{redirect, to_patch_guarded, Node, RenderContext, Transport};
use crate::search::{PageToken, ResultPage, VideoDetail, VideoSearch};
use crate::session::{SessionId, SessionRegistry};

/// A resolved page, ready to render for either transport.
#[derive(Debug, Clone)]
pub struct PageRoute {
    pub title: String,
    pub description: String,
    pub node: Node,
    /// Response status for HTTP; `None` means 200.
    pub status: Option<u16>,
    /// Whether HTTP may stream the document while it renders.
    pub streaming: bool,
}

/// Stored "show more results" continuation.
#[derive(Debug, Clone)]
pub struct Continuation {
    pub keyword: String,
    pub token: PageToken,
}

pub struct Dispatcher {
    site: SiteConfig,
    search: Arc<dyn VideoSearch>,
    jobs: Arc<JobManager>,
    sessions: SessionRegistry,
    pagination: ExpiringCache<u64, Continuation>,
    pagination_ttl: Duration,
    next_page_id: AtomicU64,
}

impl Dispatcher {
    pub fn new(
        site: SiteConfig,
        search: Arc<dyn VideoSearch>,
        jobs: Arc<JobManager>,
        sessions: SessionRegistry,
        pagination_ttl: Duration,
    ) -> Self {
        Self {
            site,
            search,
            jobs,
            sessions,
            pagination: ExpiringCache::new("pagination"),
            pagination_ttl,
            next_page_id: AtomicU64::new(0),
        }
    }

    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    pub fn jobs(&self) -> &Arc<JobManager> {
        &self.jobs
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn pagination(&self) -> &ExpiringCache<u64, Continuation> {
        &self.pagination
    }

    /// Match `url` and produce its page.
    pub async fn resolve(&self, url: &str) -> PageRoute {
        let route = Route::parse(url);
        debug!(url, route = route.name(), "Resolving route");

        match route {
            Route::Home => self.page(
                "Search Videos",
                "Search videos to download by keywords",
                pages::home(),
            ),
            Route::Search { keyword, url: input } => self.resolve_search(keyword, input).await,
            Route::MoreResults { id } => self.resolve_more_results(&id).await,
            Route::Video { id } => self.resolve_video(&id).await,
            Route::Download {
                video_id,
                format_id,
            } => self.resolve_download(url, &video_id, &format_id).await,
            Route::NotFound => self.not_found_for(url),
        }
    }

    fn page(&self, title: &str, description: &str, node: Node) -> PageRoute {
        PageRoute {
            title: self.site.title(title),
            description: if description.is_empty() {
                self.site.description.clone()
            } else {
                description.to_string()
            },
            node,
            status: None,
            streaming: true,
        }
    }

    fn buffered(&self, title: &str, description: &str, node: Node) -> PageRoute {
        PageRoute {
            streaming: false,
            ..self.page(title, description, node)
        }
    }

    fn redirect_to(&self, href: String) -> PageRoute {
        PageRoute {
            title: self.site.name.clone(),
            description: "Redirect".to_string(),
            node: redirect(href),
            status: None,
            streaming: false,
        }
    }

    async fn resolve_search(&self, keyword: Option<String>, input: Option<String>) -> PageRoute {
        if let Some(input) = input {
            return self.redirect_to(video_href(&video_id_from_input(&input)));
        }
        let Some(keyword) = keyword else {
            return self.redirect_to("/".to_string());
        };

        let result = self.search.search_by_keyword(&keyword).await;
        self.results_page(keyword, result)
    }

    async fn resolve_more_results(&self, id: &str) -> PageRoute {
        let continuation = id.parse::<u64>().ok().and_then(|id| self.pagination.get(&id));
        let Some(continuation) = continuation else {
            debug!(id, "Continuation expired or unknown");
            return self.redirect_to("/".to_string());
        };

        let result = self.search.next_page(&continuation.token).await;
        self.results_page(continuation.keyword, result)
    }

    fn results_page(
        &self,
        keyword: String,
        result: Result<ResultPage, crate::search::SearchError>,
    ) -> PageRoute {
        let title = format!("Search Result of {}", keyword);
        let description = format!("Videos search result of the keyword: {}", keyword);

        let node = match result {
            Ok(page) => {
                let more_id = page.next_page.clone().map(|token| {
                    let id = self.next_page_id.fetch_add(1, Ordering::Relaxed) + 1;
                    self.pagination.put(
                        id,
                        Continuation {
                            keyword: keyword.clone(),
                            token,
                        },
                        self.pagination_ttl,
                    );
                    id
                });
                pages::search_results(&keyword, &page, more_id)
            }
            Err(e) => {
                warn!(%keyword, search = self.search.name(), "Search failed: {}", e);
                pages::error_message(&e)
            }
        };
        self.buffered(&title, &description, node)
    }

    /// Details for headings; a failed lookup falls back to the id as title.
    async fn detail_or_placeholder(&self, video_id: &str) -> VideoDetail {
        match self.search.video_details(video_id).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!(video = video_id, "Failed to fetch video details: {}", e);
                VideoDetail::placeholder(video_id)
            }
        }
    }

    async fn resolve_video(&self, video_id: &str) -> PageRoute {
        if !is_valid_target(video_id) {
            return self.not_found_for(&format!("/video/{}", video_id));
        }

        let detail = self.detail_or_placeholder(video_id).await;
        let artifacts = self.jobs.artifacts();

        // While a job runs, files on disk may be unmerged intermediates.
        let finished = match self.jobs.job(video_id) {
            Some(_) => None,
            None => artifacts.find_by_target(video_id).await,
        };
        if let Some(filename) = finished {
            artifacts.retain(&filename);
            let node = pages::download_panel(&detail, &DownloadState::Ready { filename });
            return self.buffered(
                &format!("Download Video: {}", detail.title),
                "this video is cached",
                node,
            );
        }

        let formats = self.jobs.list_formats(video_id).await;
        let node = pages::video_page(video_id, &detail, &formats);
        self.buffered(
            &format!("New Video: {}", detail.title),
            "this video is not cached yet",
            node,
        )
    }

    async fn resolve_download(&self, url: &str, video_id: &str, format_id: &str) -> PageRoute {
        if !is_valid_target(video_id) || !is_valid_format(format_id) {
            return self.not_found_for(url);
        }

        let detail = self.detail_or_placeholder(video_id).await;
        let request = JobRequest {
            target: video_id.to_string(),
            format_id: format_id.to_string(),
            current_url: url.to_string(),
            detail: detail.clone(),
        };

        let state = match self.jobs.start(request).await {
            Ok(JobStart::Cached { filename }) => DownloadState::Ready { filename },
            Ok(JobStart::Spawned(_)) | Ok(JobStart::Attached(_)) => DownloadState::Loading,
            Err(e) => DownloadState::Failed {
                reason: e.to_string(),
                retry_href: url.to_string(),
            },
        };

        let node = pages::download_panel(&detail, &state);
        self.buffered(
            &format!("Download Video: {}", detail.title),
            "this video is cached",
            node,
        )
    }

    fn not_found_for(&self, url: &str) -> PageRoute {
        PageRoute {
            status: Some(404),
            ..self.page("Page Not Found", "", pages::not_found(url))
        }
    }

    /// The route's page inside the application frame.
    pub fn app(&self, route: &PageRoute) -> Node {
        pages::app_shell(&self.site.name, route.node.clone())
    }

    /// Messages answering a channel render of `route` at `url`.
    ///
    /// A deliberate redirect becomes a single `redirect` message; otherwise
    /// the whole application frame is replaced and the title updated.
    pub fn channel_messages(&self, url: &str, route: &PageRoute) -> Vec<ServerMessage> {
        let app = self.app(route);
        let mut ctx = RenderContext::new(url, Transport::Channel);

        match to_patch_guarded(&mut ctx, &app) {
            Some(patch) => {
                RENDERS.with_label_values(&["channel", "complete"]).inc();
                vec![
                    ServerMessage::update_in(format!("#{}", APP_ID), patch),
                    ServerMessage::SetTitle {
                        title: route.title.clone(),
                    },
                ]
            }
            None => match ctx.redirect_target() {
                Some(href) => {
                    RENDERS.with_label_values(&["channel", "redirect"]).inc();
                    vec![ServerMessage::Redirect {
                        href: href.to_string(),
                    }]
                }
                None => Vec::new(),
            },
        }
    }

    /// Handle one inbound channel message to completion.
    ///
    /// The session's displayed URL is updated before the route resolves, so
    /// a job started by this message already counts the session as a viewer.
    pub async fn handle_message(&self, session: SessionId, message: ClientMessage) {
        let url = match message {
            ClientMessage::Mount {
                url,
                locales,
                timezone,
                timezone_offset,
            } => {
                self.sessions
                    .mount(session, &url, locales, timezone, timezone_offset);
                url
            }
            ClientMessage::Navigate { url, .. } => {
                self.sessions.update_navigation(session, &url);
                url
            }
        };

        let route = self.resolve(&url).await;
        for message in self.channel_messages(&url, &route) {
            if !self.sessions.send_to(session, message) {
                debug!(session = %session, "Session closed before update was sent");
                break;
            }
        }
    }
}

/// Format selectors such as `137+140` or `bestvideo*`.
fn is_valid_format(format_id: &str) -> bool {
    !format_id.is_empty()
        && !format_id.starts_with('-')
        && format_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '_' | '*' | '/'))
}
