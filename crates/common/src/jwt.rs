//! JWT primitives shared by the credential validator.
//!
//! This module provides:
//! - Size limits for DoS prevention
//! - Clock skew constants for `iat` validation
//! - The [`CredentialClaims`] structure decoded from a verified token
//! - The [`TrustAnchor`] key material tokens are verified against
//! - Deterministic `exp`/`iat` checks against an explicit `now`
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Only HS256 (shared secret) and EdDSA (Ed25519) are accepted, fixed by the
//!   trust anchor rather than by the token header
//! - Expiry is inclusive: a token is dead at the second named by `exp`
//! - The `sub` field is redacted in Debug output

use crate::secret::{secret_bytes, ExposeSecret, SecretBytes};
use base64::Engine;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Tokens larger than this are rejected BEFORE any base64 decoding or
/// signature verification. Typical service tokens are 200-500 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance for `iat` (5 minutes).
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum configurable clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Minimum shared secret length for HS256 (32 bytes).
pub const MIN_SHARED_SECRET_BYTES: usize = 32;

/// Length of a raw Ed25519 public key.
pub const ED25519_PUBLIC_KEY_BYTES: usize = 32;

// =============================================================================
// Claims
// =============================================================================

/// Claims decoded from a verified credential.
///
/// Made available to handlers through the request extensions so business
/// logic never re-validates. The `sub` field is redacted in Debug output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialClaims {
    /// Subject (user or service identifier) - redacted in Debug output.
    pub sub: String,

    /// Issuer of the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// Expiration timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Token identifier, used for revocation lookups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Space-separated scopes granted to this token.
    #[serde(default)]
    pub scope: String,
}

impl fmt::Debug for CredentialClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialClaims")
            .field("sub", &"[REDACTED]")
            .field("iss", &self.iss)
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("jti", &self.jti)
            .field("scope", &self.scope)
            .finish()
    }
}

impl CredentialClaims {
    /// Check if the token has a specific scope.
    #[must_use]
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope.split_whitespace().any(|s| s == scope)
    }

    /// Get all scopes as a vector.
    #[must_use]
    pub fn scopes(&self) -> Vec<&str> {
        self.scope.split_whitespace().collect()
    }
}

// =============================================================================
// Trust anchor
// =============================================================================

/// Key material tokens are verified against.
///
/// Constructed once at startup and shared read-only across all calls.
pub enum TrustAnchor {
    /// HS256 shared secret.
    SharedSecret(SecretBytes),
    /// Raw 32-byte Ed25519 public key (EdDSA).
    Ed25519PublicKey(Vec<u8>),
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrustAnchor::SharedSecret(_) => f.write_str("TrustAnchor::SharedSecret([REDACTED])"),
            TrustAnchor::Ed25519PublicKey(key) => f
                .debug_tuple("TrustAnchor::Ed25519PublicKey")
                .field(&format!("{} bytes", key.len()))
                .finish(),
        }
    }
}

impl TrustAnchor {
    /// Shared-secret anchor from raw bytes.
    #[must_use]
    pub fn shared_secret(secret: impl Into<Vec<u8>>) -> Self {
        TrustAnchor::SharedSecret(secret_bytes(secret.into()))
    }

    /// Ed25519 anchor from a PEM-wrapped (or bare base64) public key.
    ///
    /// # Errors
    ///
    /// Returns `base64::DecodeError` if the key body cannot be decoded.
    pub fn ed25519_from_pem(pem: &str) -> Result<Self, base64::DecodeError> {
        decode_ed25519_public_key_pem(pem).map(TrustAnchor::Ed25519PublicKey)
    }

    /// The only algorithm this anchor verifies.
    #[must_use]
    pub fn algorithm(&self) -> Algorithm {
        match self {
            TrustAnchor::SharedSecret(_) => Algorithm::HS256,
            TrustAnchor::Ed25519PublicKey(_) => Algorithm::EdDSA,
        }
    }

    /// Length of the underlying key material.
    #[must_use]
    pub fn key_len(&self) -> usize {
        match self {
            TrustAnchor::SharedSecret(secret) => secret.expose_secret().len(),
            TrustAnchor::Ed25519PublicKey(key) => key.len(),
        }
    }

    /// Build the `jsonwebtoken` decoding key for this anchor.
    #[must_use]
    pub fn decoding_key(&self) -> DecodingKey {
        match self {
            TrustAnchor::SharedSecret(secret) => DecodingKey::from_secret(secret.expose_secret()),
            TrustAnchor::Ed25519PublicKey(key) => DecodingKey::from_ed_der(key),
        }
    }
}

// =============================================================================
// Time checks
// =============================================================================

/// Whether a token with the given `exp` is expired at `now`.
///
/// Expiry is inclusive: `exp == now` is already expired. Tokens without an
/// `exp` claim never expire by time.
#[must_use]
pub fn is_expired_at(exp: Option<i64>, now: i64) -> bool {
    match exp {
        Some(exp) => exp <= now,
        None => false,
    }
}

/// Whether an `iat` is acceptable at `now` given the clock skew tolerance.
///
/// Rejects tokens issued further in the future than `clock_skew`, which
/// indicates pre-generation or a badly drifting issuer clock.
#[must_use]
pub fn iat_within_skew_at(iat: Option<i64>, clock_skew: Duration, now: i64) -> bool {
    let Some(iat) = iat else {
        return true;
    };

    // Safe cast: clock_skew is bounded to MAX_CLOCK_SKEW (600 seconds)
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now.saturating_add(clock_skew_secs);

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            "Token rejected: iat too far in the future"
        );
        return false;
    }

    true
}

/// Decode an Ed25519 public key from PEM format.
///
/// Strips PEM header/footer lines and decodes the base64 content.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64 content cannot be decoded.
pub fn decode_ed25519_public_key_pem(pem: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let b64: String = pem
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect();

    let der = base64::engine::general_purpose::STANDARD.decode(b64)?;

    // SubjectPublicKeyInfo wrapping; keep only the raw key
    match der.strip_prefix(ED25519_SPKI_PREFIX.as_slice()) {
        Some(raw) if raw.len() == ED25519_PUBLIC_KEY_BYTES => Ok(raw.to_vec()),
        _ => Ok(der),
    }
}

/// DER prefix of an Ed25519 `SubjectPublicKeyInfo` (OID 1.3.101.112).
const ED25519_SPKI_PREFIX: [u8; 12] = [
    0x30, 0x2a, 0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70, 0x03, 0x21, 0x00,
];

// =============================================================================
// Tests
// =============================================================================
