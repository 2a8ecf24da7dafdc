//! The application: routes, pages and the dispatcher that ties them to
//! jobs, search and sessions.

mod dispatcher;
mod pages;
mod routes;

pub use dispatcher::{Continuation, Dispatcher, PageRoute};
pub use pages::{
    app_shell, download_panel, error_message, home, not_found, search_results, video_page,
    DownloadPanelView, DownloadState, APP_ID,
};
pub use routes::{
    artifact_href, download_href, more_results_href, parse_query, video_href,
    video_id_from_input, Route,
};
