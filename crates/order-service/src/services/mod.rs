//! Service layer for the order service.
//!
//! - `payment_client` - gRPC client for the payment service
//! - `order_processor` - order placement shared by the HTTP edge and the order gRPC API

pub mod order_processor;
pub mod payment_client;

pub use order_processor::{NewOrder, OrderProcessor, OrderReceipt};
pub use payment_client::{PaymentClient, PaymentClientTrait};
