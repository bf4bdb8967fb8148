//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use lazy_static::lazy_static;
use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Social graph metrics
    pub static ref FOLLOW_TOGGLES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ripple_follow_toggles_total", "Total number of follow toggle operations"),
        &["action"]
    ).expect("metric can be created");
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ripple_notifications_total", "Total number of notifications emitted"),
        &["kind"]
    ).expect("metric can be created");
    pub static ref RECONCILE_RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ripple_reconcile_runs_total", "Total number of counter reconciliation runs"),
        &["status"]
    ).expect("metric can be created");
    pub static ref RECONCILE_REPAIRS_TOTAL: IntCounter = IntCounter::new(
        "ripple_reconcile_repairs_total",
        "Total number of drifted counters repaired"
    ).expect("metric can be created");

    // Storage metrics
    pub static ref MEDIA_UPLOADS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ripple_media_uploads_total", "Total number of media uploads"),
        &["status"]
    ).expect("metric can be created");

    // Application metrics
    pub static ref USERS_TOTAL: IntGauge = IntGauge::new(
        "ripple_users_total",
        "Total number of registered users"
    ).expect("metric can be created");
    pub static ref POSTS_TOTAL: IntGauge = IntGauge::new(
        "ripple_posts_total",
        "Total number of posts"
    ).expect("metric can be created");

    // Error metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("ripple_errors_total", "Total number of errors"),
        &["error_type"]
    ).expect("metric can be created");
}

/// Initialize metrics registry.
///
/// Safe to call more than once: re-registration errors are ignored so that
/// tests spawning multiple servers in one process do not panic.
pub fn init_metrics() {
    let _ = REGISTRY.register(Box::new(FOLLOW_TOGGLES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(NOTIFICATIONS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECONCILE_RUNS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECONCILE_REPAIRS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(MEDIA_UPLOADS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(USERS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(POSTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(ERRORS_TOTAL.clone()));
}

/// Render all registered metrics in Prometheus text format.
pub fn gather() -> String {
    use prometheus::Encoder;

    let encoder = prometheus::TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(error) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(%error, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
