//! Metrics definitions for the payment service.
//!
//! All metrics follow Prometheus naming conventions:
//! - `payment_` prefix for the payment service
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `method`: 2 values (ProcessPayment, GetHealth)
//! - `code`: bounded by the gRPC status code set
//!
//! Authorization decisions are recorded by the shared layer under the
//! `checkpoint_auth_` prefix.

use common::observability::AUTH_VALIDATION_DURATION_SECONDS;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("payment_grpc_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set gRPC request buckets: {e}"))?
        // Validation is local and should stay well under a millisecond
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

/// Record a completed gRPC handler call.
///
/// Metric: `payment_grpc_requests_total`, `payment_grpc_request_duration_seconds`
/// Labels: `method`, `code`
///
/// Calls rejected by the authorization layer never reach a handler and are
/// not counted here.
pub fn record_grpc_request(method: &'static str, code: tonic::Code, duration: Duration) {
    let code = code_label(code);

    histogram!("payment_grpc_request_duration_seconds",
        "method" => method,
        "code" => code
    )
    .record(duration.as_secs_f64());

    counter!("payment_grpc_requests_total",
        "method" => method,
        "code" => code
    )
    .increment(1);
}

fn code_label(code: tonic::Code) -> &'static str {
    match code {
        tonic::Code::Ok => "ok",
        tonic::Code::InvalidArgument => "invalid_argument",
        tonic::Code::Unauthenticated => "unauthenticated",
        tonic::Code::Internal => "internal",
        _ => "other",
    }
}
