//! Observability for the order service.

pub mod metrics;

/// Default `EnvFilter` directives when `RUST_LOG` is unset.
///
/// Log targets are dotted (`order.grpc`, `common.grpc_auth`), so the module
/// path alone would not match them. Rejection reasons are logged at debug
/// under `common.grpc_auth`.
pub const DEFAULT_LOG_FILTER: &str =
    "order_service=debug,order=debug,common=info,common.grpc_auth=debug,tower_http=debug";

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::EnvFilter;

    fn enabled_by_default(check: impl FnOnce() -> bool) -> bool {
        let subscriber = tracing_subscriber::registry().with(EnvFilter::new(DEFAULT_LOG_FILTER));
        tracing::subscriber::with_default(subscriber, check)
    }

    #[test]
    fn test_default_filter_enables_service_targets() {
        assert!(enabled_by_default(|| tracing::enabled!(
            target: "order.grpc.order_service",
            Level::DEBUG
        )));
    }

    #[test]
    fn test_default_filter_shows_rejection_reasons() {
        assert!(enabled_by_default(|| tracing::enabled!(
            target: "common.grpc_auth",
            Level::DEBUG
        )));
    }

    #[test]
    fn test_default_filter_keeps_other_common_targets_at_info() {
        assert!(!enabled_by_default(|| tracing::enabled!(
            target: "common.jwt",
            Level::DEBUG
        )));
        assert!(enabled_by_default(|| tracing::enabled!(
            target: "common.jwt",
            Level::INFO
        )));
    }
}
