//! Prometheus metrics for request, upstream and correlation tracking.
//!
//! This module provides metrics for:
//! - Inbound requests per endpoint
//! - Upstream (GitHub, Cypress Cloud) request latency
//! - Which correlation tier produced a cloud URL
//! - Workflow dispatches and post-dispatch lookups

use std::time::Instant;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::debug;

// === Metric Name Constants ===

/// Inbound requests counter metric name.
pub const METRIC_HTTP_REQUESTS: &str = "http_requests_total";
/// Upstream request latency metric name.
pub const METRIC_UPSTREAM_LATENCY: &str = "upstream_request_latency_ms";
/// Correlation outcome counter metric name.
pub const METRIC_CORRELATIONS: &str = "correlations_total";
/// Workflow dispatch counter metric name.
pub const METRIC_DISPATCHES: &str = "workflow_dispatches_total";
/// Post-dispatch lookup counter metric name.
pub const METRIC_TRIGGER_LOOKUPS: &str = "trigger_lookups_total";

/// Initialize all metric descriptions.
/// Call this once at startup to register metrics with descriptions.
pub fn init_metrics() {
    describe_counter!(METRIC_HTTP_REQUESTS, "Total inbound API requests by endpoint");
    describe_histogram!(
        METRIC_UPSTREAM_LATENCY,
        "Upstream API request latency in milliseconds"
    );
    describe_counter!(
        METRIC_CORRELATIONS,
        "Correlation attempts by the tier that produced the cloud URL"
    );
    describe_counter!(METRIC_DISPATCHES, "Total workflow dispatches by environment");
    describe_counter!(
        METRIC_TRIGGER_LOOKUPS,
        "Total run lookups performed after a dispatch"
    );

    debug!("Metrics initialized");
}

/// Install the global Prometheus recorder and return its render handle.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    init_metrics();
    Ok(handle)
}

/// Increment inbound request counter.
pub fn inc_http_requests(endpoint: &'static str) {
    counter!(METRIC_HTTP_REQUESTS, "endpoint" => endpoint).increment(1);
}

/// Increment correlation counter for the tier that answered (`none` when neither did).
pub fn inc_correlations(source: &'static str) {
    counter!(METRIC_CORRELATIONS, "source" => source).increment(1);
}

/// Increment dispatch counter.
pub fn inc_dispatches(env: &'static str) {
    counter!(METRIC_DISPATCHES, "env" => env).increment(1);
}

/// Increment post-dispatch lookup counter.
pub fn inc_trigger_lookups() {
    counter!(METRIC_TRIGGER_LOOKUPS).increment(1);
}

/// RAII guard for timing upstream calls.
/// Automatically records latency when dropped.
pub struct LatencyTimer {
    start: Instant,
    upstream: &'static str,
}

impl LatencyTimer {
    /// Create a new latency timer for the given upstream.
    pub fn new(upstream: &'static str) -> Self {
        Self {
            start: Instant::now(),
            upstream,
        }
    }

    /// Get elapsed time in milliseconds (without recording).
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        histogram!(METRIC_UPSTREAM_LATENCY, "upstream" => self.upstream).record(self.elapsed_ms());
    }
}

/// Create a latency timer for an upstream call.
pub fn timer_upstream(upstream: &'static str) -> LatencyTimer {
    LatencyTimer::new(upstream)
}
