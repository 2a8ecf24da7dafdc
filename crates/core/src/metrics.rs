//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Download jobs (spawns, attachments, outcomes, progress)
//! - Expiring caches (evictions and side-effect failures)
//! - Rendering (pages and patches by outcome)
//! - External services (search API, extraction tool)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Jobs
// =============================================================================

/// Download processes spawned.
pub static JOBS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("tubefetch_jobs_started_total", "Total download jobs spawned").unwrap()
});

/// Download requests served without spawning.
pub static JOBS_DEDUPLICATED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubefetch_jobs_deduplicated_total",
            "Download requests answered without spawning a process",
        ),
        &["reason"], // "cached", "attached"
    )
    .unwrap()
});

/// Finished jobs by result.
pub static JOBS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubefetch_jobs_finished_total", "Total download jobs finished"),
        &["result"], // "succeeded", "failed"
    )
    .unwrap()
});

/// Jobs whose process is still running.
pub static JOBS_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("tubefetch_jobs_running", "Number of running download jobs").unwrap()
});

/// Job duration in seconds.
pub static JOB_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("tubefetch_job_duration_seconds", "Duration of download jobs")
            .buckets(vec![1.0, 5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1800.0]),
        &["result"],
    )
    .unwrap()
});

/// Progress lines forwarded to viewers.
pub static PROGRESS_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubefetch_progress_events_total",
        "Progress lines parsed from download output",
    )
    .unwrap()
});

/// Format listings that fell back to the static table.
pub static FORMAT_FALLBACKS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "tubefetch_format_fallbacks_total",
        "Format listings replaced by the fallback table",
    )
    .unwrap()
});

// =============================================================================
// Caches
// =============================================================================

/// Timer-driven evictions by cache.
pub static CACHE_EVICTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubefetch_cache_evictions_total", "Entries evicted by TTL"),
        &["cache"],
    )
    .unwrap()
});

/// Eviction side effects that failed.
pub static CACHE_EVICTION_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubefetch_cache_eviction_failures_total",
            "Eviction side effects that returned an error",
        ),
        &["cache"],
    )
    .unwrap()
});

// =============================================================================
// Sessions and rendering
// =============================================================================

/// Broadcast deliveries by result.
pub static BROADCAST_DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubefetch_broadcast_deliveries_total",
            "Messages delivered to sessions by URL",
        ),
        &["result"], // "delivered", "dropped"
    )
    .unwrap()
});

/// Rendered pages and patches by transport and outcome.
pub static RENDERS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("tubefetch_renders_total", "Rendered pages and patches"),
        &["transport", "outcome"], // outcome: "complete", "redirect", "error"
    )
    .unwrap()
});

// =============================================================================
// External Services
// =============================================================================

/// External service call duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "tubefetch_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"], // service: "search", "tool"
    )
    .unwrap()
});

/// External service requests by result.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "tubefetch_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "result"], // result: "success", "error"
    )
    .unwrap()
});

// =============================================================================
// Registration Helper
// =============================================================================

/// Get all core metrics for registration.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Jobs
        Box::new(JOBS_STARTED.clone()),
        Box::new(JOBS_DEDUPLICATED.clone()),
        Box::new(JOBS_FINISHED.clone()),
        Box::new(JOBS_RUNNING.clone()),
        Box::new(JOB_DURATION.clone()),
        Box::new(PROGRESS_EVENTS.clone()),
        Box::new(FORMAT_FALLBACKS.clone()),
        // Caches
        Box::new(CACHE_EVICTIONS.clone()),
        Box::new(CACHE_EVICTION_FAILURES.clone()),
        // Sessions and rendering
        Box::new(BROADCAST_DELIVERIES.clone()),
        Box::new(RENDERS.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
