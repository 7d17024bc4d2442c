//! Observability for the payment service.
//!
//! Provides metrics definitions and the health/metrics HTTP router.

pub mod health;
pub mod metrics;

/// Default `EnvFilter` directives when `RUST_LOG` is unset.
///
/// Log targets are dotted (`payment.grpc`, `common.grpc_auth`), so the module
/// path alone would not match them. Rejection reasons are logged at debug
/// under `common.grpc_auth`.
pub const DEFAULT_LOG_FILTER: &str =
    "payment_service=debug,payment=debug,common=info,common.grpc_auth=debug,tower_http=debug";
