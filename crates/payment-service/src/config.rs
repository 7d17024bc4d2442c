//! Payment service configuration.
//!
//! Configuration is loaded from environment variables. Authorization settings
//! come from the shared `AUTH_*` variables; key material is redacted in Debug
//! output.

use common::config::{AuthConfig, ConfigError as AuthConfigError};
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default gRPC bind address.
pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50061";

/// Default metrics/health HTTP bind address.
pub const DEFAULT_METRICS_BIND_ADDRESS: &str = "0.0.0.0:9091";

/// Default largest amount approved in a single payment (10,000.00).
pub const DEFAULT_APPROVAL_LIMIT_CENTS: i64 = 1_000_000;

/// Payment service configuration.
#[derive(Debug)]
pub struct Config {
    /// gRPC server bind address (default: "0.0.0.0:50061").
    pub grpc_bind_address: String,

    /// Health and metrics HTTP bind address (default: "0.0.0.0:9091").
    pub metrics_bind_address: String,

    /// Amounts above this are declined.
    pub approval_limit_cents: i64,

    /// Per-method authorization settings.
    pub auth: AuthConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid approval limit configuration: {0}")]
    InvalidApprovalLimit(String),

    #[error(transparent)]
    Auth(#[from] AuthConfigError),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let grpc_bind_address = vars
            .get("PAYMENT_GRPC_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GRPC_BIND_ADDRESS.to_string());

        let metrics_bind_address = vars
            .get("PAYMENT_METRICS_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_METRICS_BIND_ADDRESS.to_string());

        // Parse approval limit with validation
        let approval_limit_cents =
            if let Some(value_str) = vars.get("PAYMENT_APPROVAL_LIMIT_CENTS") {
                let value: i64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidApprovalLimit(format!(
                        "PAYMENT_APPROVAL_LIMIT_CENTS must be a valid integer, got '{value_str}': {e}"
                    ))
                })?;

                if value <= 0 {
                    return Err(ConfigError::InvalidApprovalLimit(format!(
                        "PAYMENT_APPROVAL_LIMIT_CENTS must be positive, got {value}"
                    )));
                }

                value
            } else {
                DEFAULT_APPROVAL_LIMIT_CENTS
            };

        let auth = AuthConfig::from_vars(vars)?;

        Ok(Config {
            grpc_bind_address,
            metrics_bind_address,
            approval_limit_cents,
            auth,
        })
    }
}
