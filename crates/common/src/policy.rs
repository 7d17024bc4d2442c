//! Per-method authentication policy.
//!
//! [`MethodPolicyRegistry`] answers one question for every inbound call: does
//! this method require a credential? It is populated once at startup from a
//! [`PolicyConfig`] and never mutated afterwards, so it can be shared through
//! an `Arc` by every in-flight call without locking.
//!
//! Lookups are exact string matches on the [`MethodId`]. There are no prefix or
//! glob rules, so there is never a question of which of several patterns wins.
//! Methods that are not listed resolve to the configured [`DefaultPolicy`], and
//! the returned [`PolicyResolution`] records that the default was used so logs
//! can tell "unknown method" apart from "registered method".

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Fully-qualified RPC method, as `package.Service/Method`.
///
/// Built from the gRPC request path with the leading `/` removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(String);

impl MethodId {
    /// Create a method identifier from `Service/Method` text.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        match id.strip_prefix('/') {
            Some(stripped) => Self(stripped.to_string()),
            None => Self(id),
        }
    }

    /// Method identifier for a gRPC request path such as
    /// `/payments.PaymentService/ProcessPayment`.
    #[must_use]
    pub fn from_path(path: &str) -> Self {
        Self::new(path)
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MethodId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Whether a method requires a credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    RequiresAuth,
    NoAuthRequired,
}

/// Decision applied to methods that are not explicitly listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DefaultPolicy {
    /// Unlisted methods require a credential.
    #[default]
    FailClosed,
    /// Unlisted methods are open.
    FailOpen,
}

impl DefaultPolicy {
    fn decision(self) -> PolicyDecision {
        match self {
            DefaultPolicy::FailClosed => PolicyDecision::RequiresAuth,
            DefaultPolicy::FailOpen => PolicyDecision::NoAuthRequired,
        }
    }
}

impl FromStr for DefaultPolicy {
    type Err = PolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail-closed" | "fail_closed" | "closed" | "deny" => Ok(DefaultPolicy::FailClosed),
            "fail-open" | "fail_open" | "open" | "allow" => Ok(DefaultPolicy::FailOpen),
            other => Err(PolicyError::UnknownDefault(other.to_string())),
        }
    }
}

/// Where a decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicySource {
    /// The method is listed in the registry.
    Registered,
    /// The method is unknown; the default policy applied.
    Default,
}

impl PolicySource {
    /// Stable label for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PolicySource::Registered => "registered",
            PolicySource::Default => "default",
        }
    }
}

/// Result of a registry lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyResolution {
    pub decision: PolicyDecision,
    pub source: PolicySource,
}

impl PolicyResolution {
    /// True when the method requires a credential.
    #[must_use]
    pub fn requires_auth(self) -> bool {
        self.decision == PolicyDecision::RequiresAuth
    }
}

/// Static policy configuration, as handed over by the config loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Methods that require a credential.
    #[serde(default)]
    pub protected_methods: Vec<String>,
    /// Methods explicitly open to unauthenticated callers.
    #[serde(default)]
    pub public_methods: Vec<String>,
    /// Decision for methods in neither list.
    #[serde(default)]
    pub default_policy: DefaultPolicy,
}

/// Errors building a registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Method listed as both protected and public: {0}")]
    ConflictingEntry(String),

    #[error("Empty method identifier in policy configuration")]
    EmptyMethod,

    #[error("Unknown default policy '{0}', expected fail-closed or fail-open")]
    UnknownDefault(String),
}

/// Read-only map from [`MethodId`] to [`PolicyDecision`].
#[derive(Debug, Clone)]
pub struct MethodPolicyRegistry {
    entries: HashMap<MethodId, PolicyDecision>,
    default_policy: DefaultPolicy,
}

impl MethodPolicyRegistry {
    /// Build the registry from configuration.
    ///
    /// # Errors
    ///
    /// - `PolicyError::EmptyMethod` - a listed method is blank
    /// - `PolicyError::ConflictingEntry` - a method is both protected and public
    pub fn new(config: &PolicyConfig) -> Result<Self, PolicyError> {
        let mut entries = HashMap::new();

        for method in &config.protected_methods {
            let id = parse_entry(method)?;
            entries.insert(id, PolicyDecision::RequiresAuth);
        }

        for method in &config.public_methods {
            let id = parse_entry(method)?;
            if entries.get(&id) == Some(&PolicyDecision::RequiresAuth) {
                return Err(PolicyError::ConflictingEntry(id.to_string()));
            }
            entries.insert(id, PolicyDecision::NoAuthRequired);
        }

        tracing::info!(
            target: "common.policy",
            registered = entries.len(),
            default_policy = ?config.default_policy,
            "Method policy registry built"
        );

        Ok(Self {
            entries,
            default_policy: config.default_policy,
        })
    }

    /// Look up the policy for a method.
    #[must_use]
    pub fn requires_auth(&self, method: &MethodId) -> PolicyResolution {
        match self.entries.get(method) {
            Some(decision) => PolicyResolution {
                decision: *decision,
                source: PolicySource::Registered,
            },
            None => PolicyResolution {
                decision: self.default_policy.decision(),
                source: PolicySource::Default,
            },
        }
    }

    /// The configured default.
    #[must_use]
    pub fn default_policy(&self) -> DefaultPolicy {
        self.default_policy
    }

    /// Number of explicitly registered methods.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no method is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn parse_entry(raw: &str) -> Result<MethodId, PolicyError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "/" {
        return Err(PolicyError::EmptyMethod);
    }
    Ok(MethodId::new(trimmed))
}
