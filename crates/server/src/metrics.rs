//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the tubefetch server:
//! - HTTP request metrics (latency, counts, page renders)
//! - Push channel connection and message metrics
//! - Registry sizes (collected dynamically)
//!
//! Job, cache and external service metrics live in the core crate and are
//! registered here alongside the server's own.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tubefetch_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubefetch_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubefetch_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Push Channel Metrics
// =============================================================================

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubefetch_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubefetch_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubefetch_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// WebSocket messages received by type.
pub static WS_MESSAGES_RECEIVED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubefetch_ws_messages_received_total",
            "WebSocket messages received",
        ),
        &["type"],
    )
    .unwrap()
});

/// Inbound messages that could not be decoded.
pub static WS_PROTOCOL_ERRORS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubefetch_ws_protocol_errors_total",
        "Inbound WebSocket messages rejected as malformed",
    )
    .unwrap()
});

// =============================================================================
// Registry Metrics (collected dynamically)
// =============================================================================

/// Registered push sessions.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("tubefetch_sessions_active", "Number of registered sessions").unwrap()
});

/// Files in the download directory with a pending eviction.
pub static ARTIFACTS_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubefetch_artifacts_tracked",
        "Number of downloaded files scheduled for eviction",
    )
    .unwrap()
});

/// Stored "show more results" continuations.
pub static PAGINATION_ENTRIES: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "tubefetch_pagination_entries",
        "Number of stored search continuations",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // WebSocket
    registry
        .register(Box::new(WS_CONNECTIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_CONNECTIONS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_SENT.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_MESSAGES_RECEIVED.clone()))
        .unwrap();
    registry
        .register(Box::new(WS_PROTOCOL_ERRORS.clone()))
        .unwrap();

    // Registries
    registry
        .register(Box::new(SESSIONS_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(ARTIFACTS_TRACKED.clone()))
        .unwrap();
    registry
        .register(Box::new(PAGINATION_ENTRIES.clone()))
        .unwrap();

    // Core metrics (jobs, caches, renders, external services)
    for metric in tubefetch_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

/// Refresh gauges that mirror registry sizes.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    SESSIONS_ACTIVE.set(state.sessions().len() as i64);
    ARTIFACTS_TRACKED.set(state.artifacts().tracked_count() as i64);
    PAGINATION_ENTRIES.set(state.dispatcher().pagination().len() as i64);
}

static PAGE_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/(video|more-result)/[^/]+/?$").unwrap());
static DOWNLOAD_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^/download/[^/]+/[^/]+/?$").unwrap());
static ARTIFACT_PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/downloads/.+$").unwrap());

/// Normalize a path for metric labels (replace route parameters with placeholders).
pub fn normalize_path(path: &str) -> String {
    if ARTIFACT_PATH.is_match(path) {
        return "/downloads/{file}".to_string();
    }
    if DOWNLOAD_PARAMS.is_match(path) {
        return "/download/{id}/{format}".to_string();
    }
    PAGE_PARAMS.replace(path, "/$1/{id}").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_video() {
        assert_eq!(normalize_path("/video/dQw4w9WgXcQ"), "/video/{id}");
        assert_eq!(normalize_path("/more-result/12"), "/more-result/{id}");
    }

    #[test]
    fn test_normalize_path_download() {
        assert_eq!(
            normalize_path("/download/dQw4w9WgXcQ/137%2B140"),
            "/download/{id}/{format}"
        );
    }

    #[test]
    fn test_normalize_path_artifact() {
        assert_eq!(
            normalize_path("/downloads/My%20Video%20%5Babc%5D.mp4"),
            "/downloads/{file}"
        );
    }

    #[test]
    fn test_normalize_path_no_ids() {
        assert_eq!(normalize_path("/search"), "/search");
        assert_eq!(normalize_path("/health"), "/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("tubefetch_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        tubefetch_core::metrics::JOBS_STARTED.inc();
        WS_CONNECTIONS_ACTIVE.set(0);
        SESSIONS_ACTIVE.set(0);

        let output = encode_metrics();

        assert!(output.contains("tubefetch_ws_connections_active"));
        assert!(output.contains("tubefetch_sessions_active"));
        assert!(output.contains("tubefetch_jobs_started_total"));
    }
}
