//! Metrics and observability utilities
//!
//! Provides Prometheus metrics with SLO-aligned histograms
//! and standardized naming conventions.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram, Unit};
use std::time::Instant;

/// Metrics prefix for all Acervo metrics
pub const METRICS_PREFIX: &str = "acervo";

/// SLO-aligned histogram buckets for request latency (in seconds)
/// Targets: P50 < 50ms, P99 < 150ms
pub const LATENCY_BUCKETS: &[f64] = &[
    0.001, // 1ms
    0.005, // 5ms
    0.010, // 10ms
    0.025, // 25ms
    0.050, // 50ms - P50 target
    0.075, // 75ms
    0.100, // 100ms
    0.150, // 150ms - P99 target
    0.250, // 250ms
    0.500, // 500ms
    1.000, // 1s
    2.500, // 2.5s
    5.000, // 5s
    10.00, // 10s
];

/// Register all metric descriptions
pub fn register_metrics() {
    // Request metrics
    describe_counter!(
        format!("{}_requests_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of HTTP requests"
    );

    describe_histogram!(
        format!("{}_request_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "HTTP request latency in seconds"
    );

    // Catalog metrics
    describe_counter!(
        format!("{}_catalog_queries_total", METRICS_PREFIX),
        Unit::Count,
        "Total number of catalog queries"
    );

    describe_histogram!(
        format!("{}_catalog_query_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Catalog query latency in seconds"
    );

    describe_gauge!(
        format!("{}_catalog_results_count", METRICS_PREFIX),
        Unit::Count,
        "Number of records matching the last catalog query"
    );

    // Retrieval metrics
    describe_counter!(
        format!("{}_retrievals_total", METRICS_PREFIX),
        Unit::Count,
        "Document retrievals by outcome (file, redirect, not_found)"
    );

    // Write metrics
    describe_counter!(
        format!("{}_record_writes_total", METRICS_PREFIX),
        Unit::Count,
        "Record create/update/deactivate operations"
    );

    // Import metrics
    describe_counter!(
        format!("{}_records_imported_total", METRICS_PREFIX),
        Unit::Count,
        "Total records created by bulk import"
    );

    describe_histogram!(
        format!("{}_import_duration_seconds", METRICS_PREFIX),
        Unit::Seconds,
        "Bulk import latency in seconds"
    );

    tracing::info!("Metrics registered");
}

/// Helper to record request metrics
pub struct RequestMetrics {
    start: Instant,
    endpoint: String,
    method: String,
}

impl RequestMetrics {
    /// Start tracking a request
    pub fn start(method: &str, endpoint: &str) -> Self {
        Self {
            start: Instant::now(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
        }
    }

    /// Record request completion
    pub fn finish(self, status: u16) {
        let duration = self.start.elapsed().as_secs_f64();

        counter!(
            format!("{}_requests_total", METRICS_PREFIX),
            "method" => self.method.clone(),
            "endpoint" => self.endpoint.clone(),
            "status" => status.to_string()
        )
        .increment(1);

        histogram!(
            format!("{}_request_duration_seconds", METRICS_PREFIX),
            "method" => self.method,
            "endpoint" => self.endpoint
        )
        .record(duration);
    }
}

/// Helper to record catalog query metrics
pub fn record_catalog_query(duration_secs: f64, scope: &str, total: u64) {
    counter!(
        format!("{}_catalog_queries_total", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .increment(1);

    histogram!(
        format!("{}_catalog_query_duration_seconds", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .record(duration_secs);

    gauge!(
        format!("{}_catalog_results_count", METRICS_PREFIX),
        "scope" => scope.to_string()
    )
    .set(total as f64);
}

/// Helper to record a retrieval outcome
pub fn record_retrieval(outcome: &str, disposition: &str) {
    counter!(
        format!("{}_retrievals_total", METRICS_PREFIX),
        "outcome" => outcome.to_string(),
        "disposition" => disposition.to_string()
    )
    .increment(1);
}

/// Helper to record a record write
pub fn record_write(operation: &str) {
    counter!(
        format!("{}_record_writes_total", METRICS_PREFIX),
        "operation" => operation.to_string()
    )
    .increment(1);
}

/// Helper to record import metrics
pub fn record_import(duration_secs: f64, created: usize) {
    counter!(format!("{}_records_imported_total", METRICS_PREFIX)).increment(created as u64);

    histogram!(format!("{}_import_duration_seconds", METRICS_PREFIX)).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_buckets() {
        // Verify buckets are sorted and contain SLO targets
        let mut prev = 0.0;
        for &bucket in LATENCY_BUCKETS {
            assert!(bucket > prev);
            prev = bucket;
        }

        assert!(LATENCY_BUCKETS.contains(&0.050));
        assert!(LATENCY_BUCKETS.contains(&0.150));
    }

    #[test]
    fn test_recorders_without_exporter() {
        // No recorder installed: calls must be no-ops
        let metrics = RequestMetrics::start("GET", "/v1/catalog");
        metrics.finish(200);
        record_catalog_query(0.01, "public", 3);
        record_retrieval("redirect", "inline");
        record_write("create");
        record_import(0.5, 2);
    }
}
