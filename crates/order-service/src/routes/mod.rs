//! HTTP routes for the order service edge.
//!
//! Defines the Axum router and application state.

use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::OrderProcessor;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Order placement, backed by the payment client.
    pub processor: OrderProcessor,
}

/// Build the edge routes.
///
/// - `/health` - Liveness probe
/// - `/metrics` - Prometheus metrics endpoint
/// - `/api/v1/orders` - Place an order (caller's credential forwarded)
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/v1/orders", post(handlers::create_order))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Each .layer() wraps everything above it, so the last one added runs first:
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Bound the handler and its trace span, answering 408
    // 3. http_metrics_middleware - Record ALL responses, timeouts included (outermost)
    api_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(middleware::from_fn(http_metrics_middleware))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::payment_client::mock::MockPaymentClient;
    use crate::services::PaymentClientTrait;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    const ORDER_JSON: &str =
        r#"{"item_sku":"SKU-1","quantity":1,"amount_cents":1500,"currency":"USD"}"#;

    fn app(mock: &Arc<MockPaymentClient>) -> Router {
        let payment: Arc<dyn PaymentClientTrait> = Arc::clone(mock) as Arc<dyn PaymentClientTrait>;
        let state = Arc::new(AppState {
            processor: OrderProcessor::new(payment),
        });
        build_routes(state, PrometheusBuilder::new().build_recorder().handle())
    }

    fn post_order(authorization: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/v1/orders")
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_state_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_payment_is_cut_off_by_timeout_layer() {
        let mock = Arc::new(MockPaymentClient::stalled(Duration::from_secs(60)));

        let response = app(&mock)
            .oneshot(post_order(Some("Bearer edge.token"), ORDER_JSON))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_create_order_without_authorization_is_401() {
        let mock = Arc::new(MockPaymentClient::approving());

        let response = app(&mock).oneshot(post_order(None, ORDER_JSON)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_create_order_without_authorization_ignores_bad_body() {
        let mock = Arc::new(MockPaymentClient::approving());

        let response = app(&mock).oneshot(post_order(None, "{")).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_order_forwards_header() {
        let mock = Arc::new(MockPaymentClient::approving());

        let response = app(&mock)
            .oneshot(post_order(Some("Bearer edge.token"), ORDER_JSON))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["payment_status"], "approved");
        assert_eq!(mock.seen_credentials(), vec!["Bearer edge.token".to_string()]);
    }

    #[tokio::test]
    async fn test_create_order_downstream_rejection_is_401() {
        let mock = Arc::new(MockPaymentClient::rejecting_credential());

        let response = app(&mock)
            .oneshot(post_order(Some("Bearer expired"), ORDER_JSON))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Authentication required");
    }

    #[tokio::test]
    async fn test_create_order_bad_json_is_400() {
        let mock = Arc::new(MockPaymentClient::approving());

        let response = app(&mock)
            .oneshot(post_order(Some("Bearer abc"), r#"{"item_sku":"SKU-1"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let mock = Arc::new(MockPaymentClient::approving());
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = app(&mock).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
