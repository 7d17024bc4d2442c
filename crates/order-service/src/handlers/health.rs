//! Liveness probe.

/// Handler for GET /health
///
/// Does not check the payment service; a slow dependency must not get the
/// edge restarted.
pub async fn health_check() -> &'static str {
    "OK"
}
