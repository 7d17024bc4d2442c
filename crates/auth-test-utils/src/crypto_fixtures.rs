//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible Ed25519 keypairs and a fixed HMAC secret.
//! All fixtures are deterministic based on seed values.

use base64::engine::general_purpose;
use base64::Engine;
use ring::signature::{Ed25519KeyPair, KeyPair};
use thiserror::Error;

/// Shared HMAC secret used by test servers and test tokens (44 bytes).
pub const TEST_HMAC_SECRET: &str = "checkpoint-test-hmac-secret-0123456789abcdef";

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// Generate a deterministic Ed25519 signing key for testing.
///
/// The same seed always produces the same keypair.
///
/// # Returns
/// * `Ok((public_key_pem, private_key_pkcs8))` - Public key as PEM-wrapped raw
///   32 bytes, private key in PKCS#8 DER
pub fn test_signing_key(seed: u8) -> Result<(String, Vec<u8>), FixtureError> {
    let seed_bytes = seed_bytes(seed);

    let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes)
        .map_err(|e| FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e)))?;

    let public_key_b64 = general_purpose::STANDARD.encode(key_pair.public_key().as_ref());
    let public_key_pem = format!(
        "-----BEGIN PUBLIC KEY-----\n{}\n-----END PUBLIC KEY-----",
        public_key_b64
    );

    Ok((public_key_pem, build_pkcs8_from_seed(&seed_bytes)))
}

/// Public key PEM for `seed`, panicking on failure.
pub fn test_public_key_pem(seed: u8) -> String {
    test_signing_key(seed)
        .expect("deterministic test key generation should not fail")
        .0
}

/// PKCS#8 private key for `seed`, panicking on failure.
pub fn test_private_key_pkcs8(seed: u8) -> Vec<u8> {
    test_signing_key(seed)
        .expect("deterministic test key generation should not fail")
        .1
}

fn seed_bytes(seed: u8) -> [u8; 32] {
    let mut seed_bytes = [0u8; 32];
    seed_bytes[0] = seed;
    for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
        *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
    }
    seed_bytes
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// Ring doesn't expose PKCS#8 for a seeded keypair, so it is assembled here.
/// This is a test-only utility.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // SEQUENCE { version INTEGER 0, AlgorithmIdentifier { OID 1.3.101.112 },
    //            privateKey OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}
