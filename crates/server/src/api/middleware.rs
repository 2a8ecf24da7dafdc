//! Request logging and metrics middleware.

use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::info;

use crate::metrics::{
    normalize_path, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION,
};

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
///
/// Streamed pages are measured until their headers are sent.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Log every request line.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
    info!(method = %request.method(), uri = %request.uri(), "Request");
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    #[tokio::test]
    async fn test_metrics_middleware_counts_requests() {
        let app = Router::new()
            .route("/video/{id}", get(dummy_handler))
            .layer(middleware::from_fn(metrics_middleware))
            .layer(middleware::from_fn(log_requests));

        let before = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/video/{id}", "200"])
            .get();

        let request = Request::builder()
            .uri("/video/abc123")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let after = HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/video/{id}", "200"])
            .get();
        assert!(after > before);
    }
}
