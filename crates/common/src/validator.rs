//! Credential validation.
//!
//! [`CredentialValidator`] turns a raw [`Credential`] into a
//! [`ValidationOutcome`]. Every failure, including empty or garbled input, is
//! folded into [`ValidationOutcome::Invalid`] with a [`RejectReason`]; nothing
//! escapes as a panic or an `Err`.
//!
//! [`JwtCredentialValidator`] verifies JWT bearer tokens against a single
//! [`TrustAnchor`]. The checks run in a fixed order:
//!
//! 1. Empty credential → `Missing`
//! 2. `"Bearer "` prefix, non-empty token, size limit → `Malformed`
//! 3. Signature and algorithm → `BadSignature` (or `Malformed` for garbage)
//! 4. `exp` (inclusive) → `Expired`
//! 5. `iat` within clock skew → `Malformed`
//! 6. `iss` in the trusted set → `UntrustedIssuer`

use crate::credential::Credential;
use crate::jwt::{
    iat_within_skew_at, is_expired_at, CredentialClaims, TrustAnchor, DEFAULT_CLOCK_SKEW,
    ED25519_PUBLIC_KEY_BYTES, MAX_CLOCK_SKEW, MAX_JWT_SIZE_BYTES, MIN_SHARED_SECRET_BYTES,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, DecodingKey, Validation};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// Why a credential was refused.
///
/// Used for logs and metrics only; callers always see the same generic
/// `UNAUTHENTICATED` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectReason {
    /// No credential was presented.
    Missing,
    /// Wrong scheme, empty or oversized token, undecodable structure.
    Malformed,
    /// Signature or algorithm did not verify against the trust anchor.
    BadSignature,
    /// `exp` is at or before the current time.
    Expired,
    /// `iss` is absent or not in the trusted set.
    UntrustedIssuer,
    /// An external validation step did not answer in time.
    ValidationTimeout,
    /// The token identifier is on the revocation list.
    Revoked,
}

impl RejectReason {
    /// Stable lowercase label for logs and metrics.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RejectReason::Missing => "missing",
            RejectReason::Malformed => "malformed",
            RejectReason::BadSignature => "bad_signature",
            RejectReason::Expired => "expired",
            RejectReason::UntrustedIssuer => "untrusted_issuer",
            RejectReason::ValidationTimeout => "validation_timeout",
            RejectReason::Revoked => "revoked",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of validating one credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    /// Credential verified; claims are safe to hand to handlers.
    Valid(CredentialClaims),
    /// Credential refused.
    Invalid(RejectReason),
}

impl ValidationOutcome {
    /// True for [`ValidationOutcome::Valid`].
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    /// The reject reason, if invalid.
    #[must_use]
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid(reason) => Some(*reason),
        }
    }
}

/// Verifies bearer credentials.
///
/// Implementations must be pure with respect to the credential, their
/// immutable configuration and the current time, so a single instance can be
/// shared across any number of concurrent calls.
pub trait CredentialValidator: Send + Sync {
    /// Validate a credential. Never panics.
    fn validate(&self, credential: &Credential) -> ValidationOutcome;
}

/// Startup errors for a misconfigured validator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidatorError {
    #[error("Trust anchor key material is empty")]
    EmptyTrustAnchor,

    #[error("Shared secret must be at least {min} bytes, got {len}")]
    SharedSecretTooShort { len: usize, min: usize },

    #[error("Ed25519 public key must be {expected} bytes, got {len}")]
    InvalidEd25519Key { len: usize, expected: usize },

    #[error("Clock skew must be between 1 and {max} seconds, got {got}")]
    InvalidClockSkew { got: u64, max: u64 },
}

/// Validation settings beyond the trust anchor.
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    /// Accepted `iss` values. Empty accepts any issuer.
    pub trusted_issuers: Vec<String>,
    /// Tolerance for `iat` in the future.
    pub clock_skew: Duration,
}

impl Default for ValidatorSettings {
    fn default() -> Self {
        Self {
            trusted_issuers: Vec::new(),
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

/// JWT validator bound to one trust anchor.
pub struct JwtCredentialValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    trusted_issuers: HashSet<String>,
    clock_skew: Duration,
}

impl fmt::Debug for JwtCredentialValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCredentialValidator")
            .field("algorithms", &self.validation.algorithms)
            .field("trusted_issuers", &self.trusted_issuers)
            .field("clock_skew", &self.clock_skew)
            .finish_non_exhaustive()
    }
}

impl JwtCredentialValidator {
    /// Build a validator. Misconfiguration here is fatal at startup.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] if the trust anchor is empty or the wrong
    /// size, or if the clock skew is outside `1..=MAX_CLOCK_SKEW`.
    pub fn new(anchor: &TrustAnchor, settings: ValidatorSettings) -> Result<Self, ValidatorError> {
        let len = anchor.key_len();
        if len == 0 {
            return Err(ValidatorError::EmptyTrustAnchor);
        }
        match anchor {
            TrustAnchor::SharedSecret(_) if len < MIN_SHARED_SECRET_BYTES => {
                return Err(ValidatorError::SharedSecretTooShort {
                    len,
                    min: MIN_SHARED_SECRET_BYTES,
                });
            }
            TrustAnchor::Ed25519PublicKey(_) if len != ED25519_PUBLIC_KEY_BYTES => {
                return Err(ValidatorError::InvalidEd25519Key {
                    len,
                    expected: ED25519_PUBLIC_KEY_BYTES,
                });
            }
            _ => {}
        }

        let skew_secs = settings.clock_skew.as_secs();
        if skew_secs == 0 || settings.clock_skew > MAX_CLOCK_SKEW {
            return Err(ValidatorError::InvalidClockSkew {
                got: skew_secs,
                max: MAX_CLOCK_SKEW.as_secs(),
            });
        }

        // exp is checked by hand so the boundary is inclusive
        let mut validation = Validation::new(anchor.algorithm());
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.required_spec_claims = HashSet::new();

        Ok(Self {
            decoding_key: anchor.decoding_key(),
            validation,
            trusted_issuers: settings.trusted_issuers.into_iter().collect(),
            clock_skew: settings.clock_skew,
        })
    }

    /// Validate against an explicit `now` (Unix seconds).
    ///
    /// Prefer [`CredentialValidator::validate`] in production code. This
    /// variant exists so boundary conditions can be tested without wall-clock
    /// dependence.
    #[instrument(skip_all, name = "common.validator.validate")]
    pub fn validate_at(&self, credential: &Credential, now: i64) -> ValidationOutcome {
        if credential.is_empty() {
            tracing::debug!(target: "common.validator", "Empty credential");
            return ValidationOutcome::Invalid(RejectReason::Missing);
        }

        let Some(token) = credential.token() else {
            tracing::debug!(target: "common.validator", "Credential missing Bearer scheme");
            return ValidationOutcome::Invalid(RejectReason::Malformed);
        };

        if token.is_empty() {
            tracing::debug!(target: "common.validator", "Empty bearer token");
            return ValidationOutcome::Invalid(RejectReason::Malformed);
        }

        if token.len() > MAX_JWT_SIZE_BYTES {
            tracing::debug!(
                target: "common.validator",
                token_size = token.len(),
                max_size = MAX_JWT_SIZE_BYTES,
                "Token exceeds size limit"
            );
            return ValidationOutcome::Invalid(RejectReason::Malformed);
        }

        let claims = match decode::<CredentialClaims>(token, &self.decoding_key, &self.validation)
        {
            Ok(data) => data.claims,
            Err(e) => {
                let reason = classify_decode_error(e.kind());
                tracing::debug!(
                    target: "common.validator",
                    error = %e,
                    reason = %reason,
                    "Token verification failed"
                );
                return ValidationOutcome::Invalid(reason);
            }
        };

        if is_expired_at(claims.exp, now) {
            tracing::debug!(
                target: "common.validator",
                exp = ?claims.exp,
                now = now,
                "Token expired"
            );
            return ValidationOutcome::Invalid(RejectReason::Expired);
        }

        if !iat_within_skew_at(claims.iat, self.clock_skew, now) {
            return ValidationOutcome::Invalid(RejectReason::Malformed);
        }

        if !self.trusted_issuers.is_empty() {
            let trusted = claims
                .iss
                .as_deref()
                .is_some_and(|iss| self.trusted_issuers.contains(iss));
            if !trusted {
                tracing::debug!(
                    target: "common.validator",
                    iss = ?claims.iss,
                    "Token issuer not trusted"
                );
                return ValidationOutcome::Invalid(RejectReason::UntrustedIssuer);
            }
        }

        tracing::trace!(target: "common.validator", "Token validated");
        ValidationOutcome::Valid(claims)
    }
}

impl CredentialValidator for JwtCredentialValidator {
    fn validate(&self, credential: &Credential) -> ValidationOutcome {
        self.validate_at(credential, chrono::Utc::now().timestamp())
    }
}

/// Map a `jsonwebtoken` failure onto the reject taxonomy.
fn classify_decode_error(kind: &ErrorKind) -> RejectReason {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidKeyFormat
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::Crypto(_) => RejectReason::BadSignature,
        ErrorKind::ExpiredSignature => RejectReason::Expired,
        ErrorKind::InvalidIssuer => RejectReason::UntrustedIssuer,
        _ => RejectReason::Malformed,
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing,
    clippy::cast_possible_truncation
)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use base64::Engine;
    use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
    use ring::signature::{Ed25519KeyPair, KeyPair};

    const SECRET: &[u8] = b"checkpoint-test-shared-secret-0123456789";
    const NOW: i64 = 1_700_000_000;

    fn claims(exp: i64) -> CredentialClaims {
        CredentialClaims {
            sub: "order-service".to_string(),
            iss: Some("checkpoint-idp".to_string()),
            exp: Some(exp),
            iat: Some(NOW - 60),
            jti: Some("jti-1".to_string()),
            scope: "payments:write".to_string(),
        }
    }

    fn sign_hs256(claims: &CredentialClaims, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret),
        )
        .unwrap()
    }

    fn hs_validator() -> JwtCredentialValidator {
        JwtCredentialValidator::new(
            &TrustAnchor::shared_secret(SECRET.to_vec()),
            ValidatorSettings::default(),
        )
        .unwrap()
    }

    fn validator_with_issuers(issuers: &[&str]) -> JwtCredentialValidator {
        JwtCredentialValidator::new(
            &TrustAnchor::shared_secret(SECRET.to_vec()),
            ValidatorSettings {
                trusted_issuers: issuers.iter().map(ToString::to_string).collect(),
                ..ValidatorSettings::default()
            },
        )
        .unwrap()
    }

    /// Deterministic Ed25519 keypair (seeded like the shared test fixtures).
    fn ed25519_keypair(seed: u8) -> (Vec<u8>, Vec<u8>) {
        let mut seed_bytes = [0u8; 32];
        seed_bytes[0] = seed;
        for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
            *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
        }
        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes).unwrap();
        let public = key_pair.public_key().as_ref().to_vec();

        let mut pkcs8 = vec![0x30, 0x2e, 0x02, 0x01, 0x00, 0x30, 0x05];
        pkcs8.extend_from_slice(&[0x06, 0x03, 0x2b, 0x65, 0x70, 0x04, 0x22, 0x04, 0x20]);
        pkcs8.extend_from_slice(&seed_bytes);
        (public, pkcs8)
    }

    // -------------------------------------------------------------------------
    // Shape of the credential
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_credential_is_missing() {
        let outcome = hs_validator().validate_at(&Credential::new(""), NOW);
        assert_eq!(outcome, ValidationOutcome::Invalid(RejectReason::Missing));
    }

    #[test]
    fn test_missing_bearer_prefix_is_malformed() {
        let outcome = hs_validator().validate_at(&Credential::new("good-token"), NOW);
        assert_eq!(outcome, ValidationOutcome::Invalid(RejectReason::Malformed));
    }

    #[test]
    fn test_lowercase_scheme_is_malformed() {
        let token = sign_hs256(&claims(NOW + 600), SECRET);
        let outcome = hs_validator().validate_at(&Credential::new(format!("bearer {token}")), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::Malformed));
    }

    #[test]
    fn test_empty_bearer_token_is_malformed() {
        let outcome = hs_validator().validate_at(&Credential::new("Bearer "), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::Malformed));
    }

    #[test]
    fn test_oversized_token_is_malformed() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        let outcome = hs_validator().validate_at(&Credential::bearer(&oversized), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::Malformed));
    }

    #[test]
    fn test_opaque_token_is_malformed() {
        let outcome = hs_validator().validate_at(&Credential::bearer("good-token"), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::Malformed));
    }

    #[test]
    fn test_garbage_segments_are_malformed() {
        let outcome = hs_validator().validate_at(&Credential::bearer("not.a.jwt"), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::Malformed));
    }

    // -------------------------------------------------------------------------
    // Signature
    // -------------------------------------------------------------------------

    #[test]
    fn test_valid_hs256_token() {
        let token = sign_hs256(&claims(NOW + 600), SECRET);
        let outcome = hs_validator().validate_at(&Credential::bearer(&token), NOW);

        match outcome {
            ValidationOutcome::Valid(decoded) => {
                assert_eq!(decoded.sub, "order-service");
                assert_eq!(decoded.iss.as_deref(), Some("checkpoint-idp"));
            }
            ValidationOutcome::Invalid(reason) => panic!("expected valid, got {reason}"),
        }
    }

    #[test]
    fn test_wrong_secret_is_bad_signature() {
        let token = sign_hs256(&claims(NOW + 600), b"another-shared-secret-of-enough-length!");
        let outcome = hs_validator().validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::BadSignature));
    }

    #[test]
    fn test_tampered_payload_is_bad_signature() {
        let token = sign_hs256(&claims(NOW + 600), SECRET);
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(
            r#"{"sub":"attacker","iss":"checkpoint-idp","exp":9999999999,"scope":"admin"}"#,
        );
        parts[1] = &forged;
        let tampered = parts.join(".");

        let outcome = hs_validator().validate_at(&Credential::bearer(&tampered), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::BadSignature));
    }

    #[test]
    fn test_algorithm_mismatch_is_bad_signature() {
        let (_, pkcs8) = ed25519_keypair(3);
        let token = encode(
            &Header::new(Algorithm::EdDSA),
            &claims(NOW + 600),
            &EncodingKey::from_ed_der(&pkcs8),
        )
        .unwrap();

        // HS256 validator must not accept an EdDSA header
        let outcome = hs_validator().validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::BadSignature));
    }

    #[test]
    fn test_valid_ed25519_token() {
        let (public, pkcs8) = ed25519_keypair(1);
        let validator = JwtCredentialValidator::new(
            &TrustAnchor::Ed25519PublicKey(public),
            ValidatorSettings::default(),
        )
        .unwrap();

        let token = encode(
            &Header::new(Algorithm::EdDSA),
            &claims(NOW + 600),
            &EncodingKey::from_ed_der(&pkcs8),
        )
        .unwrap();

        assert!(validator
            .validate_at(&Credential::bearer(&token), NOW)
            .is_valid());
    }

    #[test]
    fn test_ed25519_token_from_other_key_is_bad_signature() {
        let (public, _) = ed25519_keypair(1);
        let (_, other_pkcs8) = ed25519_keypair(2);
        let validator = JwtCredentialValidator::new(
            &TrustAnchor::Ed25519PublicKey(public),
            ValidatorSettings::default(),
        )
        .unwrap();

        let token = encode(
            &Header::new(Algorithm::EdDSA),
            &claims(NOW + 600),
            &EncodingKey::from_ed_der(&other_pkcs8),
        )
        .unwrap();

        let outcome = validator.validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::BadSignature));
    }

    // -------------------------------------------------------------------------
    // Time
    // -------------------------------------------------------------------------

    #[test]
    fn test_expiry_one_second_in_past() {
        let token = sign_hs256(&claims(NOW - 1), SECRET);
        let outcome = hs_validator().validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome, ValidationOutcome::Invalid(RejectReason::Expired));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let token = sign_hs256(&claims(NOW), SECRET);
        let validator = hs_validator();
        let credential = Credential::bearer(&token);

        assert_eq!(
            validator.validate_at(&credential, NOW),
            ValidationOutcome::Invalid(RejectReason::Expired)
        );
        assert!(validator.validate_at(&credential, NOW - 1).is_valid());
    }

    #[test]
    fn test_token_without_exp_is_accepted() {
        let mut no_exp = claims(0);
        no_exp.exp = None;
        let token = sign_hs256(&no_exp, SECRET);
        assert!(hs_validator()
            .validate_at(&Credential::bearer(&token), NOW)
            .is_valid());
    }

    #[test]
    fn test_iat_far_in_future_is_malformed() {
        let mut future = claims(NOW + 7200);
        future.iat = Some(NOW + 3600);
        let token = sign_hs256(&future, SECRET);
        let outcome = hs_validator().validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::Malformed));
    }

    #[test]
    fn test_validation_is_idempotent() {
        let token = sign_hs256(&claims(NOW + 600), SECRET);
        let validator = hs_validator();
        let credential = Credential::bearer(&token);

        let first = validator.validate_at(&credential, NOW);
        let second = validator.validate_at(&credential, NOW);
        assert_eq!(first, second);
        assert!(first.is_valid());
    }

    #[test]
    fn test_wall_clock_validate_accepts_fresh_token() {
        let now = chrono::Utc::now().timestamp();
        let mut fresh = claims(now + 600);
        fresh.iat = Some(now);
        let token = sign_hs256(&fresh, SECRET);
        assert!(hs_validator().validate(&Credential::bearer(&token)).is_valid());
    }

    // -------------------------------------------------------------------------
    // Issuer
    // -------------------------------------------------------------------------

    #[test]
    fn test_trusted_issuer_accepted() {
        let token = sign_hs256(&claims(NOW + 600), SECRET);
        let validator = validator_with_issuers(&["checkpoint-idp"]);
        assert!(validator
            .validate_at(&Credential::bearer(&token), NOW)
            .is_valid());
    }

    #[test]
    fn test_untrusted_issuer_rejected() {
        let token = sign_hs256(&claims(NOW + 600), SECRET);
        let validator = validator_with_issuers(&["someone-else"]);
        let outcome = validator.validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::UntrustedIssuer));
    }

    #[test]
    fn test_missing_issuer_rejected_when_issuers_configured() {
        let mut no_iss = claims(NOW + 600);
        no_iss.iss = None;
        let token = sign_hs256(&no_iss, SECRET);
        let validator = validator_with_issuers(&["checkpoint-idp"]);
        let outcome = validator.validate_at(&Credential::bearer(&token), NOW);
        assert_eq!(outcome.reason(), Some(RejectReason::UntrustedIssuer));
    }

    // -------------------------------------------------------------------------
    // Construction
    // -------------------------------------------------------------------------

    #[test]
    fn test_empty_trust_anchor_is_fatal() {
        let err = JwtCredentialValidator::new(
            &TrustAnchor::shared_secret(Vec::new()),
            ValidatorSettings::default(),
        )
        .unwrap_err();
        assert_eq!(err, ValidatorError::EmptyTrustAnchor);
    }

    #[test]
    fn test_short_shared_secret_is_fatal() {
        let err = JwtCredentialValidator::new(
            &TrustAnchor::shared_secret(b"short".to_vec()),
            ValidatorSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidatorError::SharedSecretTooShort { len: 5, .. }));
    }

    #[test]
    fn test_wrong_size_ed25519_key_is_fatal() {
        let err = JwtCredentialValidator::new(
            &TrustAnchor::Ed25519PublicKey(vec![1u8; 16]),
            ValidatorSettings::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidEd25519Key { len: 16, .. }));
    }

    #[test]
    fn test_clock_skew_out_of_range_is_fatal() {
        let anchor = TrustAnchor::shared_secret(SECRET.to_vec());
        for skew in [Duration::ZERO, MAX_CLOCK_SKEW + Duration::from_secs(1)] {
            let err = JwtCredentialValidator::new(
                &anchor,
                ValidatorSettings {
                    clock_skew: skew,
                    ..ValidatorSettings::default()
                },
            )
            .unwrap_err();
            assert!(matches!(err, ValidatorError::InvalidClockSkew { .. }));
        }
    }

    #[test]
    fn test_reject_reason_labels() {
        assert_eq!(RejectReason::Missing.as_str(), "missing");
        assert_eq!(RejectReason::BadSignature.to_string(), "bad_signature");
        assert_eq!(RejectReason::ValidationTimeout.as_str(), "validation_timeout");
    }
}
