//! Order Service Library
//!
//! Edge and middle hop of the order/payment example:
//!
//! - HTTP edge (`POST /api/v1/orders`) lifts the caller's `Authorization`
//!   header into a credential and forwards it on the payment call
//! - Order gRPC API (`PlaceOrder`) is protected by the shared authorization
//!   layer and forwards the verified credential downstream
//!
//! Exposed as a library so integration tests can start real servers.

#![warn(clippy::pedantic)]

pub mod config;
pub mod errors;
pub mod grpc;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod routes;
pub mod server;
pub mod services;
