//! # Auth Test Utilities
//!
//! Shared test utilities for the authorization layer and the example
//! order/payment services.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed keys for reproducible tests)
//! - Token builders that sign real JWTs and wrap them as credentials
//! - Server harnesses that run real payment and order servers on ephemeral ports
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let payment = TestPaymentServer::spawn(payment_auth_vars()).await?;
//!
//!     let credential = TestTokenBuilder::new()
//!         .for_subject("alice")
//!         .bearer_hs256();
//!
//!     let mut client = payment.client().await?;
//!     // attach credential with CredentialPropagator ...
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
