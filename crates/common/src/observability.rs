//! Authorization metrics.
//!
//! All metrics follow Prometheus naming conventions:
//! - `checkpoint_auth_` prefix for the shared authorization layer
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! - `outcome`: 2 values (dispatched, rejected)
//! - `reason`: bounded by `RejectReason` plus `none` and `anonymous`
//! - `policy_source`: 2 values (registered, default)
//!
//! Method names are deliberately not a label; they come from the caller and
//! would be unbounded under fail-open.

use metrics::{counter, histogram};
use std::time::Duration;

/// Decision counter name.
pub const AUTH_DECISIONS_TOTAL: &str = "checkpoint_auth_decisions_total";

/// Validation latency histogram name.
pub const AUTH_VALIDATION_DURATION_SECONDS: &str = "checkpoint_auth_validation_duration_seconds";

/// Record one interceptor decision.
///
/// Metric: `checkpoint_auth_decisions_total`
/// Labels: `outcome`, `reason`, `policy_source`
pub fn record_auth_decision(outcome: &'static str, reason: &'static str, policy_source: &'static str) {
    counter!(AUTH_DECISIONS_TOTAL,
        "outcome" => outcome,
        "reason" => reason,
        "policy_source" => policy_source
    )
    .increment(1);
}

/// Record how long credential validation took, including any revocation check.
///
/// Metric: `checkpoint_auth_validation_duration_seconds`
/// Labels: `outcome`
pub fn record_validation_duration(outcome: &'static str, duration: Duration) {
    histogram!(AUTH_VALIDATION_DURATION_SECONDS, "outcome" => outcome)
        .record(duration.as_secs_f64());
}
