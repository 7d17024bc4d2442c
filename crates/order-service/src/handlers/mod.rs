//! HTTP handlers for the order service edge.

pub mod health;
pub mod metrics;
pub mod orders;

pub use health::health_check;
pub use metrics::metrics_handler;
pub use orders::create_order;
