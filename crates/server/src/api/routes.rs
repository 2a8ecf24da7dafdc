use axum::{
    middleware,
    routing::{get, MethodRouter},
    Router,
};
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};

use super::{handlers, pages, ws};
use super::middleware::{log_requests, metrics_middleware};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let public_dir = state.config().server.public_dir.clone();
    let download_dir = state.artifacts().dir().to_path_buf();

    // Static assets first; anything that is not a file is a page route
    let page_routes: MethodRouter = get(pages::page).with_state(Arc::clone(&state));
    let serve_public = ServeDir::new(public_dir)
        .append_index_html_on_directories(false)
        .fallback(page_routes);

    Router::new()
        // Push channel
        .route("/ws", get(ws::ws_handler))
        // Health, config and metrics
        .route("/health", get(handlers::health))
        .route("/api/config", get(handlers::get_config))
        .route("/metrics", get(handlers::metrics))
        // Finished downloads
        .nest_service("/downloads", ServeDir::new(download_dir))
        .fallback_service(serve_public)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(log_requests))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
