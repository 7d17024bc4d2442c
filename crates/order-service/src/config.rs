//! Order service configuration.
//!
//! Configuration is loaded from environment variables. The order gRPC API is
//! protected by the shared `AUTH_*` settings; the HTTP edge forwards caller
//! credentials without validating them itself.

use common::config::{AuthConfig, ConfigError as AuthConfigError};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default HTTP edge bind address.
pub const DEFAULT_HTTP_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default order gRPC bind address.
pub const DEFAULT_GRPC_BIND_ADDRESS: &str = "0.0.0.0:50060";

/// Default payment service endpoint.
pub const DEFAULT_PAYMENT_SERVICE_URL: &str = "http://localhost:50061";

/// Default timeout for payment RPCs in seconds.
pub const DEFAULT_PAYMENT_RPC_TIMEOUT_SECONDS: u64 = 5;

/// Upper bound for the payment RPC timeout in seconds.
pub const MAX_PAYMENT_RPC_TIMEOUT_SECONDS: u64 = 60;

/// Order service configuration.
#[derive(Debug)]
pub struct Config {
    /// Edge HTTP bind address (default: "0.0.0.0:8080").
    pub http_bind_address: String,

    /// Order gRPC bind address (default: "0.0.0.0:50060").
    pub grpc_bind_address: String,

    /// Payment service endpoint.
    pub payment_service_url: String,

    /// Deadline for each payment RPC.
    pub payment_rpc_timeout: Duration,

    /// Per-method authorization settings for the order gRPC API.
    pub auth: AuthConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid payment service URL: {0}")]
    InvalidPaymentServiceUrl(String),

    #[error("Invalid payment RPC timeout configuration: {0}")]
    InvalidPaymentTimeout(String),

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
        let http_bind_address = vars
            .get("ORDER_HTTP_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_HTTP_BIND_ADDRESS.to_string());

        let grpc_bind_address = vars
            .get("ORDER_GRPC_BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_GRPC_BIND_ADDRESS.to_string());

        let payment_service_url = vars
            .get("PAYMENT_SERVICE_URL")
            .cloned()
            .unwrap_or_else(|| DEFAULT_PAYMENT_SERVICE_URL.to_string());

        if !(payment_service_url.starts_with("http://")
            || payment_service_url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidPaymentServiceUrl(format!(
                "PAYMENT_SERVICE_URL must start with http:// or https://, got '{payment_service_url}'"
            )));
        }

        let payment_rpc_timeout =
            if let Some(value_str) = vars.get("PAYMENT_RPC_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidPaymentTimeout(format!(
                        "PAYMENT_RPC_TIMEOUT_SECONDS must be a valid integer, got '{value_str}': {e}"
                    ))
                })?;

                if value == 0 || value > MAX_PAYMENT_RPC_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidPaymentTimeout(format!(
                        "PAYMENT_RPC_TIMEOUT_SECONDS must be between 1 and {MAX_PAYMENT_RPC_TIMEOUT_SECONDS}, got {value}"
                    )));
                }

                Duration::from_secs(value)
            } else {
                Duration::from_secs(DEFAULT_PAYMENT_RPC_TIMEOUT_SECONDS)
            };

        let auth = AuthConfig::from_vars(vars)?;

        Ok(Config {
            http_bind_address,
            grpc_bind_address,
            payment_service_url,
            payment_rpc_timeout,
            auth,
        })
    }
}
