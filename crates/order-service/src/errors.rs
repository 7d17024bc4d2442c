//! Order service error types.
//!
//! Errors map to HTTP responses for the edge (`IntoResponse`) and to gRPC
//! status codes for the order API (`From<OrderError> for Status`). Messages
//! returned to clients are generic; details are logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use common::grpc_auth::UNAUTHENTICATED_MESSAGE;
use common::propagation::PropagationError;
use serde::Serialize;
use thiserror::Error;
use tonic::Status;

/// Order service error type.
///
/// | Variant | HTTP | gRPC |
/// |---|---|---|
/// | `MissingCredential`, `Unauthenticated` | 401 | `UNAUTHENTICATED` |
/// | `Propagation` | 401 | `INTERNAL` |
/// | `InvalidRequest` | 400 | `INVALID_ARGUMENT` |
/// | `PaymentUnavailable` | 503 | `UNAVAILABLE` |
/// | `Internal` | 500 | `INTERNAL` |
#[derive(Debug, Error)]
pub enum OrderError {
    /// The caller sent no usable `Authorization` header.
    #[error("Missing credential")]
    MissingCredential,

    /// A downstream service rejected the forwarded credential.
    #[error("Credential rejected downstream")]
    Unauthenticated,

    /// The credential could not be attached to the outbound call.
    ///
    /// At the edge this is the caller's malformed header; behind the order
    /// gRPC API the credential already verified, so it is an internal fault.
    #[error("Credential propagation failed: {0}")]
    Propagation(#[from] PropagationError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payment service unavailable: {0}")]
    PaymentUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl OrderError {
    /// Returns the HTTP status code for this error (for metrics recording).
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            OrderError::MissingCredential
            | OrderError::Unauthenticated
            | OrderError::Propagation(_) => 401,
            OrderError::InvalidRequest(_) => 400,
            OrderError::PaymentUnavailable(_) => 503,
            OrderError::Internal(_) => 500,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for OrderError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            OrderError::MissingCredential
            | OrderError::Unauthenticated
            | OrderError::Propagation(_) => {
                tracing::debug!(target: "order.errors", error = %self, "Request unauthenticated");
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHENTICATED",
                    UNAUTHENTICATED_MESSAGE.to_string(),
                )
            }
            OrderError::InvalidRequest(reason) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", reason.clone())
            }
            OrderError::PaymentUnavailable(reason) => {
                tracing::warn!(target: "order.errors", reason = %reason, "Payment service unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Service temporarily unavailable".to_string(),
                )
            }
            OrderError::Internal(reason) => {
                tracing::error!(target: "order.errors", reason = %reason, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"checkpoint\", error=\"invalid_token\""),
            );
        }

        response
    }
}

impl From<OrderError> for Status {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::MissingCredential | OrderError::Unauthenticated => {
                Status::unauthenticated(UNAUTHENTICATED_MESSAGE)
            }
            OrderError::Propagation(e) => e.into(),
            OrderError::InvalidRequest(reason) => Status::invalid_argument(reason),
            OrderError::PaymentUnavailable(reason) => {
                tracing::warn!(target: "order.errors", reason = %reason, "Payment service unavailable");
                Status::unavailable("Service temporarily unavailable")
            }
            OrderError::Internal(reason) => {
                tracing::error!(target: "order.errors", reason = %reason, "Internal error");
                Status::internal("An internal error occurred")
            }
        }
    }
}
