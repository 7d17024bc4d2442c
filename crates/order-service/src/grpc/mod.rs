//! gRPC service implementations for the order service.

pub mod order_service;

pub use order_service::OrderGrpcService;
