//! Credential revocation checks.
//!
//! Revocation is the one validation step allowed to do I/O, so it is async and
//! runs after signature, issuer and expiry checks have passed. The auth layer
//! bounds every check with a timeout; a check that does not finish in time
//! rejects the call.

use crate::jwt::CredentialClaims;
use std::collections::HashSet;

/// Looks up whether a validated credential has been revoked.
#[async_trait::async_trait]
pub trait RevocationCheck: Send + Sync {
    /// True when the credential must no longer be accepted.
    async fn is_revoked(&self, claims: &CredentialClaims) -> bool;
}

/// Fixed set of revoked token IDs (`jti`), loaded once at startup.
///
/// Credentials without a `jti` are never considered revoked by this list.
#[derive(Debug, Clone, Default)]
pub struct StaticRevocationList {
    revoked: HashSet<String>,
}

impl StaticRevocationList {
    #[must_use]
    pub fn new<I, S>(token_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            revoked: token_ids.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.revoked.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.revoked.is_empty()
    }
}

#[async_trait::async_trait]
impl RevocationCheck for StaticRevocationList {
    async fn is_revoked(&self, claims: &CredentialClaims) -> bool {
        claims
            .jti
            .as_deref()
            .is_some_and(|jti| self.revoked.contains(jti))
    }
}

/// Mock revocation checks for tests.
pub mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers a fixed result after an optional delay, counting calls.
    pub struct MockRevocationCheck {
        revoked: bool,
        delay: Option<Duration>,
        call_count: AtomicUsize,
    }

    impl MockRevocationCheck {
        /// Never revoked, answers immediately.
        #[must_use]
        pub fn allowing() -> Self {
            Self {
                revoked: false,
                delay: None,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Always revoked, answers immediately.
        #[must_use]
        pub fn revoking() -> Self {
            Self {
                revoked: true,
                delay: None,
                call_count: AtomicUsize::new(0),
            }
        }

        /// Never revoked, but sleeps for `delay` before answering.
        #[must_use]
        pub fn slow(delay: Duration) -> Self {
            Self {
                revoked: false,
                delay: Some(delay),
                call_count: AtomicUsize::new(0),
            }
        }

        /// Number of checks started.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl RevocationCheck for MockRevocationCheck {
        async fn is_revoked(&self, _claims: &CredentialClaims) -> bool {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.revoked
        }
    }
}
