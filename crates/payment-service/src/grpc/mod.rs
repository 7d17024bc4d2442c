//! gRPC service implementations for the payment service.

pub mod payment_service;

pub use payment_service::PaymentGrpcService;
