//! Prometheus metrics for the crawl frontier
//!
//! This module provides metrics tracking for:
//! - Producers: URLs accepted and rejected (by reason)
//! - Consumers: fetch outcomes and fetch latency
//! - Registry: tracked and retired hosts
//!
//! # Usage
//!
//! Call `init_metrics()` at application startup to register all metrics.
//! If initialization fails, metrics operations become no-ops.

use prometheus::{
    register_counter, register_counter_vec, register_gauge, register_gauge_vec,
    register_histogram, Counter, CounterVec, Encoder, Gauge, GaugeVec, Histogram, TextEncoder,
};
use std::sync::OnceLock;

// ============================================================================
// Metrics Storage
// ============================================================================

/// Container for all frontier metrics
struct FrontierMetrics {
    urls_enqueued: Counter,
    urls_rejected: CounterVec,
    fetches: CounterVec,
    fetch_duration: Histogram,
    hosts: Gauge,
    hosts_retired: Counter,
    workers: GaugeVec,
}

/// Global storage for frontier metrics
static FRONTIER_METRICS: OnceLock<FrontierMetrics> = OnceLock::new();

/// Flag to track if initialization was attempted
static METRICS_INIT_ATTEMPTED: OnceLock<bool> = OnceLock::new();

// ============================================================================
// Initialization
// ============================================================================

/// Initialize all Prometheus metrics
///
/// This function should be called once at application startup.
/// If metric registration fails, subsequent metric operations become no-ops.
///
/// # Example
///
/// ```ignore
/// if let Err(e) = baram_frontier::metrics::init_metrics() {
///     eprintln!("Warning: Metrics initialization failed: {}", e);
/// }
/// ```
pub fn init_metrics() -> Result<(), Box<dyn std::error::Error>> {
    // Prevent double initialization
    if METRICS_INIT_ATTEMPTED.get().is_some() {
        return Ok(());
    }
    METRICS_INIT_ATTEMPTED.set(true).ok();

    let metrics = FrontierMetrics {
        urls_enqueued: register_counter!(
            "frontier_urls_enqueued_total",
            "Total path-queries accepted into host queues"
        )?,
        urls_rejected: register_counter_vec!(
            "frontier_urls_rejected_total",
            "Total URLs rejected by the frontier",
            &["reason"]
        )?,
        fetches: register_counter_vec!(
            "frontier_fetches_total",
            "Total fetch outcomes reported by consumers",
            &["outcome"]
        )?,
        fetch_duration: register_histogram!(
            "frontier_fetch_duration_seconds",
            "Fetch latency in seconds",
            vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
        )?,
        hosts: register_gauge!("frontier_hosts", "Number of hosts tracked by the registry")?,
        hosts_retired: register_counter!(
            "frontier_hosts_retired_total",
            "Total hosts retired from the registry"
        )?,
        workers: register_gauge_vec!(
            "frontier_workers",
            "Consumer workers by state",
            &["state"]
        )?,
    };

    FRONTIER_METRICS
        .set(metrics)
        .map_err(|_| "Frontier metrics already initialized")?;

    tracing::info!("Prometheus metrics initialized successfully");
    Ok(())
}

/// Check if metrics have been initialized
pub fn metrics_initialized() -> bool {
    FRONTIER_METRICS.get().is_some()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, Box<dyn std::error::Error>> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Record an accepted path-query
pub fn record_enqueued() {
    if let Some(m) = FRONTIER_METRICS.get() {
        m.urls_enqueued.inc();
    }
}

/// Record a rejected URL
pub fn record_rejected(reason: &str) {
    if let Some(m) = FRONTIER_METRICS.get() {
        m.urls_rejected.with_label_values(&[reason]).inc();
    }
}

/// Record a reported fetch outcome
pub fn record_fetch(success: bool) {
    if let Some(m) = FRONTIER_METRICS.get() {
        let outcome = if success { "success" } else { "failure" };
        m.fetches.with_label_values(&[outcome]).inc();
    }
}

/// Record how long a fetch took
pub fn observe_fetch_duration(secs: f64) {
    if let Some(m) = FRONTIER_METRICS.get() {
        m.fetch_duration.observe(secs);
    }
}

/// Update the tracked host gauge
pub fn set_hosts(count: usize) {
    if let Some(m) = FRONTIER_METRICS.get() {
        m.hosts.set(count as f64);
    }
}

/// Record a retired host
pub fn record_retired() {
    if let Some(m) = FRONTIER_METRICS.get() {
        m.hosts_retired.inc();
    }
}

/// Update worker gauges
pub fn set_workers(active: usize, waiting: usize) {
    let Some(m) = FRONTIER_METRICS.get() else {
        return;
    };

    m.workers.with_label_values(&["active"]).set(active as f64);
    m.workers.with_label_values(&["waiting"]).set(waiting as f64);
}

// ============================================================================
// Tests
// ============================================================================
