//! Generated Protocol Buffer code for the Checkpoint example services.
//!
//! Message types and tonic client/server stubs for the payment and order
//! services.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::doc_markdown)] // Generated code has various doc formatting
#![allow(clippy::default_trait_access)]
#![allow(clippy::too_many_lines)]

// Re-export prost traits for convenience
pub use prost::Message;

// Generated protobuf modules. Server stubs use unwrap internally.
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::pedantic)]
pub mod payments {
    //! Downstream payment service
    tonic::include_proto!("payments");
}

#[allow(clippy::unwrap_used, clippy::expect_used, clippy::pedantic)]
pub mod orders {
    //! Order service called by the edge
    tonic::include_proto!("orders");
}
