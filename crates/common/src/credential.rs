//! Bearer credentials carried across RPC hops.
//!
//! A [`Credential`] is the raw `authorization` value exactly as the caller
//! presented it, e.g. `"Bearer eyJhbGciOi..."`. It is never parsed in place or
//! rewritten: the propagator sends these bytes verbatim and the interceptor
//! reads them back unchanged. Scheme parsing happens on demand through
//! [`Credential::token`].
//!
//! The value lives in a [`SecretString`], so `Debug` output and tracing fields
//! never contain the token.

use crate::secret::{ExposeSecret, SecretString};
use std::fmt;

/// Metadata key carrying the credential on every RPC hop.
pub const AUTHORIZATION_METADATA_KEY: &str = "authorization";

/// Scheme prefix a well-formed credential must start with (case-sensitive).
pub const BEARER_PREFIX: &str = "Bearer ";

/// An opaque bearer credential.
#[derive(Clone)]
pub struct Credential {
    raw: SecretString,
}

impl Credential {
    /// Wrap a raw credential string as received or issued.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: SecretString::from(raw.into()),
        }
    }

    /// Build a `"Bearer <token>"` credential from bare token material.
    #[must_use]
    pub fn bearer(token: &str) -> Self {
        Self::new(format!("{BEARER_PREFIX}{token}"))
    }

    /// The raw value. Callers exposing it must not log the result.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.raw.expose_secret()
    }

    /// True when the credential carries no characters at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }

    /// The scheme tag preceding the first space, if any.
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        self.expose()
            .split_once(' ')
            .map(|(scheme, _)| scheme)
            .filter(|scheme| !scheme.is_empty())
    }

    /// Token material following the `"Bearer "` prefix.
    ///
    /// Returns `None` when the prefix is missing. The returned slice may be
    /// empty (`"Bearer "`); callers decide how to treat that.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.expose().strip_prefix(BEARER_PREFIX)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("scheme", &self.scheme())
            .field("raw", &"[REDACTED]")
            .finish()
    }
}

impl From<String> for Credential {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for Credential {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}
