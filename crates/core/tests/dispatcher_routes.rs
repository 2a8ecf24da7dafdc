//! Page resolution integration tests.
//!
//! Covers the dispatcher against a mock search API:
//! - Search redirects and pagination continuations
//! - Video and download pages with and without a finished file
//! - Channel messages for updates and redirects

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;

use tubefetch_core::{
    app::PageRoute,
    protocol::{ClientMessage, ServerMessage},
    render::{render_to_string, RenderContext, Transport},
    search::SearchError,
    testing::{fixtures, MockSearch, RecordedSearchCall},
};

struct TestHarness {
    app: fixtures::TestApp,
    search: Arc<MockSearch>,
    download_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let download_dir = TempDir::new().expect("Failed to create download dir");
        let search = Arc::new(MockSearch::new());
        // No tool is installed; listings fall back and spawns fail.
        let tool_path = download_dir.path().join("missing-tool");
        let app = fixtures::test_app(
            download_dir.path(),
            &tool_path,
            search.clone(),
            Duration::from_secs(3600),
        );
        Self {
            app,
            search,
            download_dir,
        }
    }

    async fn resolve(&self, url: &str) -> PageRoute {
        self.app.dispatcher.resolve(url).await
    }

    fn html(&self, url: &str, route: &PageRoute) -> String {
        let mut ctx = RenderContext::new(url, Transport::Http);
        render_to_string(&mut ctx, &route.node).expect("page should render")
    }

    fn redirect_of(&self, url: &str, route: &PageRoute) -> Option<String> {
        match self.app.dispatcher.channel_messages(url, route).as_slice() {
            [ServerMessage::Redirect { href }] => Some(href.clone()),
            _ => None,
        }
    }
}

// =============================================================================
// Search
// =============================================================================

#[tokio::test]
async fn test_search_with_url_redirects_to_video() {
    let harness = TestHarness::new();
    let url = "/search?q=&url=https%3A%2F%2Fyoutu.be%2FdQw4w9WgXcQ";

    let route = harness.resolve(url).await;

    assert_eq!(
        harness.redirect_of(url, &route).as_deref(),
        Some("/video/dQw4w9WgXcQ")
    );
    assert_eq!(harness.search.call_count().await, 0);
}

#[tokio::test]
async fn test_empty_search_redirects_home() {
    let harness = TestHarness::new();
    let route = harness.resolve("/search?q=").await;
    assert_eq!(harness.redirect_of("/search?q=", &route).as_deref(), Some("/"));
}

#[tokio::test]
async fn test_search_stores_continuation() {
    let harness = TestHarness::new();
    harness
        .search
        .set_keyword_page(fixtures::result_page(&["a1", "b2"], Some("tok")))
        .await;
    harness
        .search
        .add_page("tok", fixtures::result_page(&["c3"], None))
        .await;

    let url = "/search?q=funny+cats";
    let route = harness.resolve(url).await;
    assert_eq!(route.title, "Search Result of funny cats | tubefetch");
    assert!(!route.streaming);

    let page = harness.html(url, &route);
    assert!(page.contains("href=\"/video/a1\""));
    assert!(page.contains("href=\"/more-result/1\""));
    assert_eq!(harness.app.dispatcher.pagination().len(), 1);

    let more = harness.resolve("/more-result/1").await;
    let page = harness.html("/more-result/1", &more);
    assert!(page.contains("href=\"/video/c3\""));
    assert!(!page.contains("/more-result/"));

    let calls = harness.search.recorded_calls().await;
    assert_eq!(
        calls,
        vec![
            RecordedSearchCall::Keyword("funny cats".to_string()),
            RecordedSearchCall::NextPage(tubefetch_core::search::PageToken("tok".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_unknown_continuation_redirects_home() {
    let harness = TestHarness::new();
    for url in ["/more-result/99", "/more-result/abc"] {
        let route = harness.resolve(url).await;
        assert_eq!(harness.redirect_of(url, &route).as_deref(), Some("/"));
    }
}

#[tokio::test]
async fn test_search_failure_renders_inline_error() {
    let harness = TestHarness::new();
    harness
        .search
        .set_next_error(SearchError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        })
        .await;

    let url = "/search?q=cats";
    let route = harness.resolve(url).await;

    assert_eq!(route.status, None);
    assert!(harness.html(url, &route).contains("class=\"error\""));
    assert_eq!(harness.app.dispatcher.pagination().len(), 0);
}

// =============================================================================
// Video and download pages
// =============================================================================

#[tokio::test]
async fn test_video_without_file_lists_formats() {
    let harness = TestHarness::new();
    harness
        .search
        .add_detail("abc", fixtures::video_detail("Cats"))
        .await;

    let route = harness.resolve("/video/abc").await;
    let page = harness.html("/video/abc", &route);

    assert_eq!(route.title, "New Video: Cats | tubefetch");
    assert!(page.contains("href=\"/download/abc/18\""));
    // Streaming rows from the fallback table are hidden.
    assert!(!page.contains("href=\"/download/abc/233\""));
    assert_eq!(harness.app.artifacts.tracked_count(), 0);
}

#[tokio::test]
async fn test_video_with_file_shows_ready_panel() {
    let harness = TestHarness::new();
    std::fs::write(harness.download_dir.path().join("Cats [abc].mp4"), b"x").unwrap();

    let route = harness.resolve("/video/abc").await;
    let page = harness.html("/video/abc", &route);

    assert!(page.contains("Video ready: Cats [abc].mp4"));
    assert!(harness.app.artifacts.is_tracked("Cats [abc].mp4"));
}

#[tokio::test]
async fn test_detail_failure_uses_placeholder() {
    let harness = TestHarness::new();

    let route = harness.resolve("/video/xyz").await;

    assert_eq!(route.title, "New Video: xyz | tubefetch");
    assert!(harness.html("/video/xyz", &route).contains("<h2>xyz</h2>"));
}

#[tokio::test]
async fn test_download_with_file_is_ready() {
    let harness = TestHarness::new();
    std::fs::write(harness.download_dir.path().join("Cats [abc].mp4"), b"x").unwrap();

    let route = harness.resolve("/download/abc/18").await;
    let page = harness.html("/download/abc/18", &route);

    assert!(page.contains("Video ready: Cats [abc].mp4"));
    assert!(harness.app.jobs.running_jobs().is_empty());
}

#[tokio::test]
async fn test_download_spawn_failure_offers_retry() {
    let harness = TestHarness::new();

    let route = harness.resolve("/download/abc/18").await;
    let page = harness.html("/download/abc/18", &route);

    assert!(page.contains("Download failed"));
    assert!(page.contains("href=\"/download/abc/18\""));
    assert_eq!(harness.app.artifacts.tracked_count(), 0);
}

#[tokio::test]
async fn test_invalid_ids_are_not_found() {
    let harness = TestHarness::new();
    for url in ["/video/a%20b", "/download/abc/--exec", "/nope"] {
        let route = harness.resolve(url).await;
        assert_eq!(route.status, Some(404), "{}", url);
    }
}

#[cfg(unix)]
#[tokio::test]
async fn test_download_in_progress_shows_loading_without_timer() {
    use tubefetch_core::testing::FakeTool;

    let download_dir = TempDir::new().unwrap();
    let script_dir = TempDir::new().unwrap();
    let gate = script_dir.path().join("release");
    let tool = FakeTool::new(script_dir.path())
        .gated_by(&gate)
        .install()
        .unwrap();
    let app = fixtures::test_app(
        download_dir.path(),
        &tool,
        Arc::new(MockSearch::new()),
        Duration::from_secs(3600),
    );

    let route = app.dispatcher.resolve("/download/abc/18").await;
    let mut ctx = RenderContext::new("/download/abc/18", Transport::Http);
    let page = render_to_string(&mut ctx, &route.node).unwrap();

    assert!(page.contains("<p id=\"downloadProgress\"></p>"));
    assert_eq!(app.artifacts.tracked_count(), 0);
    assert!(app.jobs.job("abc").is_some());

    std::fs::write(&gate, b"").unwrap();
}

#[cfg(unix)]
#[tokio::test]
async fn test_video_page_ignores_intermediates_while_downloading() {
    use tubefetch_core::testing::FakeTool;

    let download_dir = TempDir::new().unwrap();
    let script_dir = TempDir::new().unwrap();
    let gate = script_dir.path().join("release");
    let tool = FakeTool::new(script_dir.path())
        .gated_by(&gate)
        .install()
        .unwrap();
    let app = fixtures::test_app(
        download_dir.path(),
        &tool,
        Arc::new(MockSearch::new()),
        Duration::from_secs(3600),
    );

    app.dispatcher.resolve("/download/abc/137+140").await;
    assert!(app.jobs.job("abc").is_some());
    std::fs::write(download_dir.path().join("Cats [abc].f137.mp4"), b"x").unwrap();

    let route = app.dispatcher.resolve("/video/abc").await;
    let mut ctx = RenderContext::new("/video/abc", Transport::Http);
    let page = render_to_string(&mut ctx, &route.node).unwrap();

    assert!(!page.contains("Video ready"));
    assert!(page.contains("href=\"/download/abc/18\""));
    assert_eq!(app.artifacts.tracked_count(), 0);

    let route = app.dispatcher.resolve("/download/abc/18").await;
    let mut ctx = RenderContext::new("/download/abc/18", Transport::Http);
    let page = render_to_string(&mut ctx, &route.node).unwrap();
    assert!(page.contains("<p id=\"downloadProgress\"></p>"));
    assert_eq!(app.artifacts.tracked_count(), 0);

    std::fs::write(&gate, b"").unwrap();
}

// =============================================================================
// Channel
// =============================================================================

#[tokio::test]
async fn test_mount_replaces_app_and_sets_title() {
    let harness = TestHarness::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = harness.app.sessions.register(tx);

    let mount = ClientMessage::parse(r#"["mount","/",["en-US"],"UTC",0]"#).unwrap();
    harness.app.dispatcher.handle_message(session, mount).await;

    match rx.recv().await.unwrap() {
        ServerMessage::UpdateIn { selector, .. } => assert_eq!(selector, "#app"),
        other => panic!("unexpected message: {:?}", other),
    }
    assert_eq!(
        rx.recv().await.unwrap(),
        ServerMessage::SetTitle {
            title: "Search Videos | tubefetch".to_string()
        }
    );
    assert_eq!(harness.app.sessions.sessions_at("/"), vec![session]);
}

#[tokio::test]
async fn test_navigate_to_redirecting_route_sends_redirect() {
    let harness = TestHarness::new();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let session = harness.app.sessions.register(tx);

    let navigate = ClientMessage::parse(r#"["/search?url=abc"]"#).unwrap();
    harness.app.dispatcher.handle_message(session, navigate).await;

    assert_eq!(
        rx.recv().await.unwrap(),
        ServerMessage::Redirect {
            href: "/video/abc".to_string()
        }
    );
    assert!(rx.try_recv().is_err());
    assert_eq!(
        harness.app.sessions.get(session).unwrap().url.as_deref(),
        Some("/search?url=abc")
    );
}
