//! Metrics definitions for the order service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `order_` prefix for the order service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `method` (HTTP): bounded by the verbs axum routes
//! - `endpoint`: normalized to known paths or `/other`
//! - `method` (gRPC): 2 values (PlaceOrder, GetHealth)
//! - `code`: bounded by `OrderError` variants
//! - `outcome`: 3 values (approved, declined, error)

use common::observability::AUTH_VALIDATION_DURATION_SECONDS;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("order_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("order_grpc_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.500,
            ],
        )
        .map_err(|e| format!("Failed to set gRPC request buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Full(AUTH_VALIDATION_DURATION_SECONDS.to_string()),
            &[
                0.0001, 0.00025, 0.0005, 0.001, 0.0025, 0.005, 0.010, 0.050, 0.250,
            ],
        )
        .map_err(|e| format!("Failed to set validation buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `order_http_requests_total`, `order_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status_code`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let endpoint = normalize_endpoint(endpoint);

    histogram!("order_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => endpoint
    )
    .record(duration.as_secs_f64());

    counter!("order_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Unknown paths collapse to `/other` to bound cardinality.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/api/v1/orders" => "/api/v1/orders",
        _ => "/other",
    }
}

// ============================================================================
// gRPC Metrics
// ============================================================================

/// Record a completed order gRPC handler call.
///
/// Metric: `order_grpc_requests_total`, `order_grpc_request_duration_seconds`
/// Labels: `method`, `code`
pub fn record_grpc_request(method: &'static str, code: &'static str, duration: Duration) {
    histogram!("order_grpc_request_duration_seconds",
        "method" => method,
        "code" => code
    )
    .record(duration.as_secs_f64());

    counter!("order_grpc_requests_total",
        "method" => method,
        "code" => code
    )
    .increment(1);
}

// ============================================================================
// Order Metrics
// ============================================================================

/// Record an order placement attempt.
///
/// Metric: `order_placements_total`
/// Labels: `outcome`
pub fn record_order_placed(outcome: &str) {
    counter!("order_placements_total", "outcome" => outcome.to_string()).increment(1);
}
