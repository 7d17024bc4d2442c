//! Order Service gRPC implementation.
//!
//! - `PlaceOrder` - protected; forwards the verified credential to payments
//! - `GetHealth` - public liveness probe
//!
//! This is the middle hop of the multi-hop flow. The credential the order
//! service's own authorization layer verified is forwarded as received; the
//! payment service validates it again.

use crate::errors::OrderError;
use crate::observability::metrics;
use crate::services::{NewOrder, OrderProcessor};
use common::grpc_auth::AuthenticatedCall;
use proto_gen::orders::order_service_server::OrderService;
use proto_gen::orders::{HealthRequest, HealthResponse, PlaceOrderRequest, PlaceOrderResponse};
use std::time::Instant;
use tonic::{Request, Response, Status};
use tracing::instrument;

/// Service name reported by `GetHealth`.
pub const SERVICE_NAME: &str = "order-service";

/// Order Service gRPC implementation.
#[derive(Clone)]
pub struct OrderGrpcService {
    processor: OrderProcessor,
}

impl OrderGrpcService {
    #[must_use]
    pub fn new(processor: OrderProcessor) -> Self {
        Self { processor }
    }
}

#[tonic::async_trait]
impl OrderService for OrderGrpcService {
    #[instrument(skip_all, name = "order.grpc.place_order")]
    async fn place_order(
        &self,
        request: Request<PlaceOrderRequest>,
    ) -> Result<Response<PlaceOrderResponse>, Status> {
        let start = Instant::now();

        let caller = request
            .extensions()
            .get::<AuthenticatedCall>()
            .cloned()
            .ok_or(OrderError::Unauthenticated);

        let result = match caller {
            Ok(caller) => {
                let inner = request.into_inner();
                let order = NewOrder {
                    item_sku: inner.item_sku,
                    quantity: inner.quantity,
                    amount_cents: inner.amount_cents,
                    currency: inner.currency,
                };
                self.processor.place_order(&caller.credential, order).await
            }
            Err(e) => Err(e),
        };

        let code = match &result {
            Ok(_) => "ok",
            Err(e) => grpc_code_label(e),
        };
        metrics::record_grpc_request("PlaceOrder", code, start.elapsed());

        let receipt = result?;
        Ok(Response::new(PlaceOrderResponse {
            order_id: receipt.order_id,
            payment_id: receipt.payment_id,
            payment_status: receipt.payment_status,
            charged_principal: receipt.charged_principal,
        }))
    }

    #[instrument(skip_all, name = "order.grpc.get_health")]
    async fn get_health(
        &self,
        _request: Request<HealthRequest>,
    ) -> Result<Response<HealthResponse>, Status> {
        metrics::record_grpc_request("GetHealth", "ok", std::time::Duration::ZERO);
        Ok(Response::new(HealthResponse {
            status: "SERVING".to_string(),
            service: SERVICE_NAME.to_string(),
        }))
    }
}

fn grpc_code_label(err: &OrderError) -> &'static str {
    match err {
        OrderError::MissingCredential | OrderError::Unauthenticated => "unauthenticated",
        OrderError::InvalidRequest(_) => "invalid_argument",
        OrderError::PaymentUnavailable(_) => "unavailable",
        OrderError::Propagation(_) | OrderError::Internal(_) => "internal",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::payment_client::mock::MockPaymentClient;
    use crate::services::PaymentClientTrait;
    use common::credential::Credential;
    use common::jwt::CredentialClaims;
    use common::policy::{MethodId, PolicySource};
    use std::sync::Arc;

    fn authenticated_call(raw: &str) -> AuthenticatedCall {
        AuthenticatedCall {
            method: MethodId::new("orders.OrderService/PlaceOrder"),
            claims: CredentialClaims {
                sub: "user-123".to_string(),
                iss: None,
                exp: None,
                iat: None,
                jti: None,
                scope: String::new(),
            },
            credential: Credential::new(raw),
            policy_source: PolicySource::Registered,
        }
    }

    fn place_order_request() -> PlaceOrderRequest {
        PlaceOrderRequest {
            item_sku: "SKU-1".to_string(),
            quantity: 1,
            amount_cents: 999,
            currency: "USD".to_string(),
        }
    }

    fn service(mock: &Arc<MockPaymentClient>) -> OrderGrpcService {
        let payment: Arc<dyn PaymentClientTrait> = Arc::clone(mock) as Arc<dyn PaymentClientTrait>;
        OrderGrpcService::new(OrderProcessor::new(payment))
    }

    #[tokio::test]
    async fn test_place_order_forwards_inbound_credential() {
        let mock = Arc::new(MockPaymentClient::approving());
        let mut request = Request::new(place_order_request());
        request
            .extensions_mut()
            .insert(authenticated_call("Bearer inbound.jwt.value"));

        let response = service(&mock)
            .place_order(request)
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.payment_status, "approved");
        assert_eq!(
            mock.seen_credentials(),
            vec!["Bearer inbound.jwt.value".to_string()]
        );
    }

    #[tokio::test]
    async fn test_place_order_without_identity_never_calls_payment() {
        let mock = Arc::new(MockPaymentClient::approving());

        let status = service(&mock)
            .place_order(Request::new(place_order_request()))
            .await
            .unwrap_err();

        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_place_order_downstream_rejection_maps_to_unauthenticated() {
        let mock = Arc::new(MockPaymentClient::rejecting_credential());
        let mut request = Request::new(place_order_request());
        request.extensions_mut().insert(authenticated_call("Bearer x"));

        let status = service(&mock).place_order(request).await.unwrap_err();

        assert_eq!(status.code(), tonic::Code::Unauthenticated);
        assert_eq!(status.message(), "Authentication required");
    }

    #[tokio::test]
    async fn test_get_health() {
        let mock = Arc::new(MockPaymentClient::approving());

        let response = service(&mock)
            .get_health(Request::new(HealthRequest {}))
            .await
            .unwrap()
            .into_inner();

        assert_eq!(response.service, SERVICE_NAME);
    }

    #[test]
    fn test_grpc_code_label() {
        assert_eq!(grpc_code_label(&OrderError::Unauthenticated), "unauthenticated");
        assert_eq!(
            grpc_code_label(&OrderError::PaymentUnavailable("x".into())),
            "unavailable"
        );
    }
}
