//! Secret types that keep credentials and key material out of logs.
//!
//! Re-exports the [`secrecy`] types used throughout Checkpoint. Bearer
//! credentials, shared HMAC secrets and client-supplied `Authorization`
//! headers are all held in one of these wrappers, so any struct that derives
//! `Debug` over them prints `[REDACTED]` instead of the value.
//!
//! Access always goes through an explicit `expose_secret()` call, which makes
//! every place a credential leaves its wrapper easy to audit with grep.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{ExposeSecret, SecretString};
//!
//! #[derive(Debug)]
//! struct OutboundCall {
//!     method: String,
//!     authorization: SecretString,
//! }
//!
//! let call = OutboundCall {
//!     method: "payments.PaymentService/ProcessPayment".to_string(),
//!     authorization: SecretString::from("Bearer abc.def.ghi"),
//! };
//!
//! assert!(!format!("{call:?}").contains("abc.def.ghi"));
//! assert_eq!(call.authorization.expose_secret(), "Bearer abc.def.ghi");
//! ```
//!
//! Use `SecretString` for bearer credentials and textual secrets, and
//! [`SecretBytes`] for raw key material such as an HS256 shared secret.

pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Raw secret key material, zeroized on drop.
pub type SecretBytes = SecretBox<Vec<u8>>;

/// Wrap raw bytes as [`SecretBytes`].
#[must_use]
pub fn secret_bytes(bytes: Vec<u8>) -> SecretBytes {
    SecretBox::new(Box::new(bytes))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[test]
    fn test_debug_is_redacted() {
        let secret = SecretString::from("Bearer live-token");
        let debug_str = format!("{secret:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("live-token"));
    }

    #[test]
    fn test_secret_bytes_debug_is_redacted() {
        let key = secret_bytes(b"0123456789abcdef0123456789abcdef".to_vec());
        let debug_str = format!("{key:?}");

        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("0123456789"));
        assert_eq!(key.expose_secret().len(), 32);
    }

    #[test]
    fn test_deserialize_keeps_value_hidden() {
        #[allow(dead_code)]
        #[derive(Debug, Deserialize)]
        struct AnchorConfig {
            issuer: String,
            hmac_secret: SecretString,
        }

        let json = r#"{"issuer": "checkpoint-idp", "hmac_secret": "shared-secret-value"}"#;
        let cfg: AnchorConfig = serde_json::from_str(json).expect("deserialize");

        assert_eq!(cfg.hmac_secret.expose_secret(), "shared-secret-value");

        let debug = format!("{cfg:?}");
        assert!(debug.contains("checkpoint-idp"));
        assert!(!debug.contains("shared-secret-value"));
    }
}
