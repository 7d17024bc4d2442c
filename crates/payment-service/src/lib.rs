//! Payment Service Library
//!
//! Downstream service in the order/payment example. `ProcessPayment`
//! requires a bearer credential; `GetHealth` is open.
//!
//! Exposed as a library so integration tests can start a real server.

#![warn(clippy::pedantic)]

pub mod config;
pub mod errors;
pub mod grpc;
pub mod observability;
pub mod server;
