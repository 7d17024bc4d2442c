//! Shared authorization configuration.
//!
//! Every service that enforces per-method auth reads the same `AUTH_*`
//! environment variables. Loading is split from building: [`AuthConfig`] is
//! plain data that can be inspected and tested, and [`AuthConfig::build_layer`]
//! turns it into the runtime [`GrpcAuthLayer`]. Both steps fail at startup, never
//! during a call.

use crate::grpc_auth::{Authorizer, GrpcAuthLayer, DEFAULT_REVOCATION_TIMEOUT};
use crate::jwt::{TrustAnchor, DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use crate::policy::{DefaultPolicy, MethodPolicyRegistry, PolicyConfig, PolicyError};
use crate::revocation::StaticRevocationList;
use crate::validator::{JwtCredentialValidator, ValidatorError, ValidatorSettings};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const AUTH_PROTECTED_METHODS: &str = "AUTH_PROTECTED_METHODS";
pub const AUTH_PUBLIC_METHODS: &str = "AUTH_PUBLIC_METHODS";
pub const AUTH_DEFAULT_POLICY: &str = "AUTH_DEFAULT_POLICY";
pub const AUTH_HMAC_SECRET: &str = "AUTH_HMAC_SECRET";
pub const AUTH_ED25519_PUBLIC_KEY_PEM: &str = "AUTH_ED25519_PUBLIC_KEY_PEM";
pub const AUTH_TRUSTED_ISSUERS: &str = "AUTH_TRUSTED_ISSUERS";
pub const AUTH_CLOCK_SKEW_SECONDS: &str = "AUTH_CLOCK_SKEW_SECONDS";
pub const AUTH_REVOCATION_TIMEOUT_MS: &str = "AUTH_REVOCATION_TIMEOUT_MS";
pub const AUTH_REVOKED_TOKEN_IDS: &str = "AUTH_REVOKED_TOKEN_IDS";

/// Upper bound for the revocation timeout.
pub const MAX_REVOCATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Exactly one of AUTH_HMAC_SECRET or AUTH_ED25519_PUBLIC_KEY_PEM must be set")]
    AmbiguousTrustAnchor,

    #[error("Invalid trust anchor: {0}")]
    InvalidTrustAnchor(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidClockSkew(String),

    #[error("Invalid revocation timeout configuration: {0}")]
    InvalidRevocationTimeout(String),

    #[error("Invalid method policy: {0}")]
    Policy(#[from] PolicyError),

    #[error("Invalid validator configuration: {0}")]
    Validator(#[from] ValidatorError),
}

/// Authorization settings shared by all services.
pub struct AuthConfig {
    /// Which methods need a credential.
    pub policy: PolicyConfig,

    /// Key material credentials are verified against.
    pub trust_anchor: TrustAnchor,

    /// Accepted `iss` values. Empty accepts any issuer.
    pub trusted_issuers: Vec<String>,

    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,

    /// Bound on each revocation lookup.
    pub revocation_timeout: Duration,

    /// Revoked token IDs. Revocation checks are skipped when empty.
    pub revoked_token_ids: Vec<String>,
}

/// Custom Debug implementation that redacts key material.
impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("policy", &self.policy)
            .field("trust_anchor", &self.trust_anchor)
            .field("trusted_issuers", &self.trusted_issuers)
            .field("clock_skew", &self.clock_skew)
            .field("revocation_timeout", &self.revocation_timeout)
            .field("revoked_token_ids", &self.revoked_token_ids.len())
            .finish()
    }
}

impl AuthConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`AuthConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the trust anchor is missing or ambiguous, or a
    /// value fails to parse or is out of range.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let default_policy = match vars.get(AUTH_DEFAULT_POLICY) {
            Some(value) => value.parse::<DefaultPolicy>()?,
            None => DefaultPolicy::FailClosed,
        };

        let policy = PolicyConfig {
            protected_methods: parse_list(vars.get(AUTH_PROTECTED_METHODS)),
            public_methods: parse_list(vars.get(AUTH_PUBLIC_METHODS)),
            default_policy,
        };

        let trust_anchor = match (
            vars.get(AUTH_HMAC_SECRET),
            vars.get(AUTH_ED25519_PUBLIC_KEY_PEM),
        ) {
            (Some(secret), None) => TrustAnchor::shared_secret(secret.as_bytes().to_vec()),
            (None, Some(pem)) => TrustAnchor::ed25519_from_pem(pem).map_err(|e| {
                ConfigError::InvalidTrustAnchor(format!(
                    "{AUTH_ED25519_PUBLIC_KEY_PEM} is not valid PEM: {e}"
                ))
            })?,
            (Some(_), Some(_)) => return Err(ConfigError::AmbiguousTrustAnchor),
            (None, None) => {
                return Err(ConfigError::MissingEnvVar(format!(
                    "{AUTH_HMAC_SECRET} or {AUTH_ED25519_PUBLIC_KEY_PEM}"
                )))
            }
        };

        // Parse clock skew with validation
        let clock_skew = if let Some(value_str) = vars.get(AUTH_CLOCK_SKEW_SECONDS) {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidClockSkew(format!(
                    "{AUTH_CLOCK_SKEW_SECONDS} must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidClockSkew(format!(
                    "{AUTH_CLOCK_SKEW_SECONDS} must be positive, got {value}"
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidClockSkew(format!(
                    "{AUTH_CLOCK_SKEW_SECONDS} must not exceed {} seconds, got {value}",
                    MAX_CLOCK_SKEW.as_secs()
                )));
            }

            Duration::from_secs(value)
        } else {
            DEFAULT_CLOCK_SKEW
        };

        // Parse revocation timeout with validation
        let revocation_timeout = if let Some(value_str) = vars.get(AUTH_REVOCATION_TIMEOUT_MS) {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRevocationTimeout(format!(
                    "{AUTH_REVOCATION_TIMEOUT_MS} must be a valid positive integer, got '{value_str}': {e}"
                ))
            })?;

            let timeout = Duration::from_millis(value);
            if value == 0 || timeout > MAX_REVOCATION_TIMEOUT {
                return Err(ConfigError::InvalidRevocationTimeout(format!(
                    "{AUTH_REVOCATION_TIMEOUT_MS} must be between 1 and {}, got {value}",
                    MAX_REVOCATION_TIMEOUT.as_millis()
                )));
            }

            timeout
        } else {
            DEFAULT_REVOCATION_TIMEOUT
        };

        Ok(AuthConfig {
            policy,
            trust_anchor,
            trusted_issuers: parse_list(vars.get(AUTH_TRUSTED_ISSUERS)),
            clock_skew,
            revocation_timeout,
            revoked_token_ids: parse_list(vars.get(AUTH_REVOKED_TOKEN_IDS)),
        })
    }

    /// Build the registry and validator behind an [`Authorizer`].
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Policy` or `ConfigError::Validator` when the
    /// configuration is inconsistent.
    pub fn build_authorizer(&self) -> Result<Authorizer, ConfigError> {
        let registry = MethodPolicyRegistry::new(&self.policy)?;
        let validator = JwtCredentialValidator::new(
            &self.trust_anchor,
            ValidatorSettings {
                trusted_issuers: self.trusted_issuers.clone(),
                clock_skew: self.clock_skew,
            },
        )?;

        Ok(Authorizer::new(Arc::new(registry), Arc::new(validator)))
    }

    /// Build the tower layer to place in front of a tonic server.
    ///
    /// # Errors
    ///
    /// See [`AuthConfig::build_authorizer`].
    pub fn build_layer(&self) -> Result<GrpcAuthLayer, ConfigError> {
        let layer = GrpcAuthLayer::new(self.build_authorizer()?);

        if self.revoked_token_ids.is_empty() {
            return Ok(layer);
        }

        let revocation = StaticRevocationList::new(self.revoked_token_ids.iter().cloned());
        tracing::info!(
            target: "common.config",
            revoked = revocation.len(),
            timeout_ms = u64::try_from(self.revocation_timeout.as_millis()).unwrap_or(u64::MAX),
            "Revocation check enabled"
        );
        Ok(layer.with_revocation(Arc::new(revocation), self.revocation_timeout))
    }
}

/// Split a comma-separated value, dropping blanks.
#[must_use]
pub fn parse_list(value: Option<&String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}
