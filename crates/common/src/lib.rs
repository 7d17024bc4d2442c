//! Per-method authorization for service-to-service gRPC.
//!
//! Shared by every Checkpoint service: credential validation, the method
//! policy registry, the server-side auth layer and client-side credential
//! propagation.

#![warn(clippy::pedantic)]

/// Module for per-call metadata
pub mod call_context;

/// Module for shared authorization configuration
pub mod config;

/// Module for bearer credentials
pub mod credential;

/// Module for the server-side gRPC authorization layer
pub mod grpc_auth;

/// Module for JWT utilities (claims, trust anchors, time checks)
pub mod jwt;

/// Module for authorization metrics
pub mod observability;

/// Module for per-method authentication policy
pub mod policy;

/// Module for forwarding credentials on outbound calls
pub mod propagation;

/// Module for credential revocation checks
pub mod revocation;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for common data types
pub mod types;

/// Module for credential validation
pub mod validator;
