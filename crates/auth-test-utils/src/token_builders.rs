//! Builder patterns for test tokens
//!
//! Provides a fluent API for creating signed JWTs and the bearer credentials
//! that carry them.

use crate::crypto_fixtures::{test_private_key_pkcs8, TEST_HMAC_SECRET};
use chrono::{Duration, Utc};
use common::credential::Credential;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for creating test JWTs
///
/// Defaults: subject `test-subject`, issued now, expires in one hour, no
/// issuer, no `jti`, empty scope.
///
/// # Example
/// ```rust,ignore
/// let credential = TestTokenBuilder::new()
///     .for_subject("alice")
///     .issued_by("https://idp.test")
///     .expires_in(300)
///     .bearer_hs256();
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    sub: String,
    iss: Option<String>,
    exp: Option<i64>,
    iat: Option<i64>,
    jti: Option<String>,
    scope: String,
}

impl TestTokenBuilder {
    /// Create a new token builder with defaults
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            sub: "test-subject".to_string(),
            iss: None,
            exp: Some((now + Duration::seconds(3600)).timestamp()),
            iat: Some(now.timestamp()),
            jti: None,
            scope: String::new(),
        }
    }

    /// Set the subject (user/service)
    pub fn for_subject(mut self, subject: &str) -> Self {
        self.sub = subject.to_string();
        self
    }

    /// Set the issuer
    pub fn issued_by(mut self, issuer: &str) -> Self {
        self.iss = Some(issuer.to_string());
        self
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(mut self, timestamp: i64) -> Self {
        self.exp = Some(timestamp);
        self
    }

    /// Omit the `exp` claim entirely
    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Set issued-at timestamp
    pub fn issued_at(mut self, timestamp: i64) -> Self {
        self.iat = Some(timestamp);
        self
    }

    /// Set the token identifier (used by revocation lists)
    pub fn with_jti(mut self, jti: &str) -> Self {
        self.jti = Some(jti.to_string());
        self
    }

    /// Set the scope (space-separated)
    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = scope.to_string();
        self
    }

    /// Build the claims as a JSON value
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("scope".to_string(), json!(self.scope));
        if let Some(iss) = &self.iss {
            claims.insert("iss".to_string(), json!(iss));
        }
        if let Some(exp) = self.exp {
            claims.insert("exp".to_string(), json!(exp));
        }
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(jti) = &self.jti {
            claims.insert("jti".to_string(), json!(jti));
        }
        Value::Object(claims)
    }

    /// Sign with HS256 using `secret`
    pub fn sign_hs256(&self, secret: &[u8]) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            &self.claims(),
            &EncodingKey::from_secret(secret),
        )
        .expect("HS256 signing should not fail")
    }

    /// Sign with EdDSA using the deterministic key for `seed`
    pub fn sign_ed25519(&self, seed: u8) -> String {
        let pkcs8 = test_private_key_pkcs8(seed);
        encode(
            &Header::new(Algorithm::EdDSA),
            &self.claims(),
            &EncodingKey::from_ed_der(&pkcs8),
        )
        .expect("EdDSA signing should not fail")
    }

    /// HS256 token signed with [`TEST_HMAC_SECRET`], as a bearer credential
    pub fn bearer_hs256(&self) -> Credential {
        Credential::bearer(&self.sign_hs256(TEST_HMAC_SECRET.as_bytes()))
    }

    /// EdDSA token for `seed`, as a bearer credential
    pub fn bearer_ed25519(&self, seed: u8) -> Credential {
        Credential::bearer(&self.sign_ed25519(seed))
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Take a valid token and flip one character of its signature.
pub fn tamper_signature(token: &str) -> String {
    let mut bytes = token.as_bytes().to_vec();
    let last = bytes.len() - 2;
    bytes[last] = if bytes[last] == b'A' { b'B' } else { b'A' };
    String::from_utf8(bytes).expect("JWTs are ASCII")
}
