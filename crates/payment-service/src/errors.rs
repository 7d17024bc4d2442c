//! Payment service error types.
//!
//! Errors map to gRPC status codes via `From<PaymentError> for Status`.
//! Internal details are logged server-side but not exposed to clients.

use thiserror::Error;
use tonic::Status;

/// Payment service error type.
///
/// Maps to gRPC status codes:
/// - `InvalidRequest`: `INVALID_ARGUMENT`
/// - `Unauthenticated`: `UNAUTHENTICATED`
/// - `Internal`: `INTERNAL`
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Request payload failed validation.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Handler reached without an authenticated identity.
    #[error("Authentication required")]
    Unauthenticated,

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<PaymentError> for Status {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::InvalidRequest(reason) => Status::invalid_argument(reason),
            PaymentError::Unauthenticated => {
                Status::unauthenticated(common::grpc_auth::UNAUTHENTICATED_MESSAGE)
            }
            PaymentError::Internal(reason) => {
                tracing::error!(target: "payment.errors", reason = %reason, "Internal error");
                Status::internal("An internal error occurred")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_request_maps_to_invalid_argument() {
        let status: Status = PaymentError::InvalidRequest("amount must be positive".into()).into();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
        assert_eq!(status.message(), "amount must be positive");
    }

    #[test]
    fn test_unauthenticated_uses_generic_message() {
        let status: Status = PaymentError::Unauthenticated.into();
        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "Authentication required");
    }

    #[test]
    fn test_internal_hides_details() {
        let status: Status = PaymentError::Internal("ledger offline at 10.0.0.7".into()).into();
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("10.0.0.7"));
    }
}
