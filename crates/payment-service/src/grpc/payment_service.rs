//! Payment Service gRPC implementation.
//!
//! - `ProcessPayment` - protected; charges the principal the credential names
//! - `GetHealth` - public liveness probe
//!
//! Authorization happens before these handlers run. A protected handler
//! reads the verified identity from the request extensions and never
//! inspects the `authorization` metadata itself.

use crate::errors::PaymentError;
use crate::observability::metrics;
use common::grpc_auth::AuthenticatedCall;
use common::types::{OrderId, PaymentId};
use proto_gen::payments::payment_service_server::PaymentService;
use proto_gen::payments::{
    HealthRequest, HealthResponse, PaymentStatus, ProcessPaymentRequest, ProcessPaymentResponse,
};
use std::time::Instant;
use tonic::{Request, Response, Status};
use tracing::{info, instrument, warn};

/// Service name reported by `GetHealth`.
pub const SERVICE_NAME: &str = "payment-service";

/// Payment Service gRPC implementation.
#[derive(Debug, Clone)]
pub struct PaymentGrpcService {
    /// Amounts above this are declined.
    approval_limit_cents: i64,
}

impl PaymentGrpcService {
    /// Create a new payment service.
    #[must_use]
    pub fn new(approval_limit_cents: i64) -> Self {
        Self {
            approval_limit_cents,
        }
    }

    /// Validate a payment request payload.
    fn validate_request(request: &ProcessPaymentRequest) -> Result<OrderId, PaymentError> {
        let order_id: OrderId = request
            .order_id
            .parse()
            .map_err(|_| PaymentError::InvalidRequest("order_id must be a UUID".to_string()))?;

        if request.amount_cents <= 0 {
            return Err(PaymentError::InvalidRequest(
                "amount_cents must be positive".to_string(),
            ));
        }

        let currency_ok = request.currency.len() == 3
            && request.currency.chars().all(|c| c.is_ascii_uppercase());
        if !currency_ok {
            return Err(PaymentError::InvalidRequest(
                "currency must be a 3-letter ISO code".to_string(),
            ));
        }

        Ok(order_id)
    }

    /// Approve when the amount fits under the configured limit.
    fn decide(&self, amount_cents: i64) -> PaymentStatus {
        if amount_cents <= self.approval_limit_cents {
            PaymentStatus::Approved
        } else {
            PaymentStatus::Declined
        }
    }

    fn process(&self, request: Request<ProcessPaymentRequest>) -> Result<ProcessPaymentResponse, PaymentError> {
        let caller = request
            .extensions()
            .get::<AuthenticatedCall>()
            .cloned()
            .ok_or(PaymentError::Unauthenticated)?;

        let inner = request.into_inner();
        let order_id = Self::validate_request(&inner)?;
        let status = self.decide(inner.amount_cents);
        let payment_id = PaymentId::new();

        info!(
            target: "payment.grpc.payment_service",
            order_id = %order_id,
            payment_id = %payment_id,
            amount_cents = inner.amount_cents,
            status = status.as_str_name(),
            "Processed payment"
        );

        Ok(ProcessPaymentResponse {
            payment_id: payment_id.to_string(),
            status: status.into(),
            charged_principal: caller.claims.sub,
        })
    }
}

#[tonic::async_trait]
impl PaymentService for PaymentGrpcService {
    #[instrument(skip_all, name = "payment.grpc.process_payment")]
    async fn process_payment(
        &self,
        request: Request<ProcessPaymentRequest>,
    ) -> Result<Response<ProcessPaymentResponse>, Status> {
        let start = Instant::now();
        let result = self.process(request);

        let code = match &result {
            Ok(_) => tonic::Code::Ok,
            Err(PaymentError::InvalidRequest(_)) => tonic::Code::InvalidArgument,
            Err(PaymentError::Unauthenticated) => tonic::Code::Unauthenticated,
            Err(PaymentError::Internal(_)) => tonic::Code::Internal,
        };
        metrics::record_grpc_request("ProcessPayment", code, start.elapsed());

        match result {
            Ok(response) => Ok(Response::new(response)),
            Err(e) => {
                warn!(target: "payment.grpc.payment_service", error = %e, "Payment request failed");
                Err(e.into())
            }
        }
    }

    #[instrument(skip_all, name = "payment.grpc.get_health")]
    async fn get_health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        metrics::record_grpc_request("GetHealth", tonic::Code::Ok, std::time::Duration::ZERO);
        Ok(Response::new(HealthResponse {
            status: "SERVING".to_string(),
            service: SERVICE_NAME.to_string(),
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use common::credential::Credential;
    use common::jwt::CredentialClaims;
    use common::policy::{MethodId, PolicySource};

    fn caller(sub: &str) -> AuthenticatedCall {
        AuthenticatedCall {
            method: MethodId::new("payments.PaymentService/ProcessPayment"),
            claims: CredentialClaims {
                sub: sub.to_string(),
                iss: None,
                exp: None,
                iat: None,
                jti: None,
                scope: String::new(),
            },
            credential: Credential::bearer("opaque"),
            policy_source: PolicySource::Registered,
        }
    }

    fn payment(amount_cents: i64) -> ProcessPaymentRequest {
        ProcessPaymentRequest {
            order_id: OrderId::new().to_string(),
            amount_cents,
            currency: "USD".to_string(),
        }
    }

    fn authenticated(req: ProcessPaymentRequest, sub: &str) -> Request<ProcessPaymentRequest> {
        let mut request = Request::new(req);
        request.extensions_mut().insert(caller(sub));
        request
    }

    #[tokio::test]
    async fn test_process_payment_approves_within_limit() {
        let service = PaymentGrpcService::new(10_000);

        let response = service
            .process_payment(authenticated(payment(2_500), "user-123"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.status(), PaymentStatus::Approved);
        assert_eq!(response.charged_principal, "user-123");
        assert!(response.payment_id.parse::<PaymentId>().is_ok());
    }

    #[tokio::test]
    async fn test_process_payment_declines_over_limit() {
        let service = PaymentGrpcService::new(10_000);

        let response = service
            .process_payment(authenticated(payment(10_001), "user-123"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.status(), PaymentStatus::Declined);
    }

    #[tokio::test]
    async fn test_process_payment_limit_is_inclusive() {
        let service = PaymentGrpcService::new(10_000);

        let response = service
            .process_payment(authenticated(payment(10_000), "user-123"))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.status(), PaymentStatus::Approved);
    }

    #[tokio::test]
    async fn test_process_payment_without_identity_is_unauthenticated() {
        let service = PaymentGrpcService::new(10_000);

        let status = service
            .process_payment(Request::new(payment(100)))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "Authentication required");
    }

    #[tokio::test]
    async fn test_process_payment_rejects_bad_payloads() {
        let service = PaymentGrpcService::new(10_000);

        let bad = [
            ProcessPaymentRequest {
                order_id: "not-a-uuid".to_string(),
                ..payment(100)
            },
            payment(0),
            payment(-1),
            ProcessPaymentRequest {
                currency: "usd".to_string(),
                ..payment(100)
            },
            ProcessPaymentRequest {
                currency: "EURO".to_string(),
                ..payment(100)
            },
        ];

        for req in bad {
            let status = service
                .process_payment(authenticated(req, "user-123"))
                .await
                .unwrap_err();
            assert_eq!(status.code(), tonic::Code::InvalidArgument);
        }
    }

    #[tokio::test]
    async fn test_get_health() {
        let service = PaymentGrpcService::new(10_000);

        let response = service
            .get_health(Request::new(HealthRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.status, "SERVING");
        assert_eq!(response.service, SERVICE_NAME);
    }
}
