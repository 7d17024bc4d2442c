//! Multi-hop credential propagation tests.
//!
//! client -> order gRPC (authorized) -> payment gRPC (authorized again).
//! The order service forwards the credential it received, so the payment
//! service charges the principal the original caller authenticated as.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use auth_test_utils::{
    order_auth_vars, payment_auth_vars, TestOrderServer, TestPaymentServer, TestTokenBuilder,
};
use common::propagation::{wrap, CredentialPropagator};
use proto_gen::orders::order_service_client::OrderServiceClient;
use proto_gen::orders::{HealthRequest, PlaceOrderRequest};
use tonic::{Code, Request};

fn order_request(amount_cents: i64) -> PlaceOrderRequest {
    PlaceOrderRequest {
        item_sku: "SKU-1001".to_string(),
        quantity: 2,
        amount_cents,
        currency: "USD".to_string(),
    }
}

async fn spawn_pair() -> (TestPaymentServer, TestOrderServer) {
    let payment = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let order = TestOrderServer::spawn(order_auth_vars(), &payment.url())
        .await
        .unwrap();
    (payment, order)
}

#[tokio::test]
async fn test_credential_propagates_across_two_hops() {
    let (_payment, order) = spawn_pair().await;
    let credential = TestTokenBuilder::new().for_subject("carol").bearer_hs256();

    let mut client = OrderServiceClient::with_interceptor(
        order.channel().await.unwrap(),
        CredentialPropagator::new(&credential).unwrap(),
    );

    let receipt = client
        .place_order(order_request(2_500))
        .await
        .expect("authorized order should succeed")
        .into_inner();

    assert_eq!(receipt.charged_principal, "carol");
    assert_eq!(receipt.payment_status, "approved");
    assert!(!receipt.order_id.is_empty());
    assert!(!receipt.payment_id.is_empty());
}

#[tokio::test]
async fn test_each_caller_is_charged_as_themselves() {
    let (_payment, order) = spawn_pair().await;
    let channel = order.channel().await.unwrap();

    for subject in ["dave", "erin"] {
        let credential = TestTokenBuilder::new().for_subject(subject).bearer_hs256();
        let request = wrap(Request::new(order_request(100)), &credential).unwrap();

        let receipt = OrderServiceClient::new(channel.clone())
            .place_order(request)
            .await
            .unwrap()
            .into_inner();

        assert_eq!(receipt.charged_principal, subject);
    }
}

#[tokio::test]
async fn test_first_hop_rejects_missing_credential() {
    let (_payment, order) = spawn_pair().await;
    let mut client = order.client().await.unwrap();

    let status = client.place_order(order_request(100)).await.unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication required");
}

#[tokio::test]
async fn test_first_hop_rejects_expired_credential() {
    let (_payment, order) = spawn_pair().await;
    let credential = TestTokenBuilder::new().expires_in(-1).bearer_hs256();
    let request = wrap(Request::new(order_request(100)), &credential).unwrap();

    let status = order
        .client()
        .await
        .unwrap()
        .place_order(request)
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn test_second_hop_rejection_surfaces_as_unauthenticated() {
    // Order trusts any issuer, payment trusts only one
    let mut payment_vars = payment_auth_vars();
    payment_vars.insert(
        "AUTH_TRUSTED_ISSUERS".to_string(),
        "https://idp.checkpoint.test".to_string(),
    );
    let payment = TestPaymentServer::spawn(payment_vars).await.unwrap();
    let order = TestOrderServer::spawn(order_auth_vars(), &payment.url())
        .await
        .unwrap();

    let credential = TestTokenBuilder::new()
        .issued_by("https://elsewhere.test")
        .bearer_hs256();
    let request = wrap(Request::new(order_request(100)), &credential).unwrap();

    let status = order
        .client()
        .await
        .unwrap()
        .place_order(request)
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn test_declined_payment_is_reported_not_rejected() {
    let mut payment_vars = payment_auth_vars();
    payment_vars.insert("PAYMENT_APPROVAL_LIMIT_CENTS".to_string(), "500".to_string());
    let payment = TestPaymentServer::spawn(payment_vars).await.unwrap();
    let order = TestOrderServer::spawn(order_auth_vars(), &payment.url())
        .await
        .unwrap();

    let credential = TestTokenBuilder::new().bearer_hs256();
    let request = wrap(Request::new(order_request(501)), &credential).unwrap();

    let receipt = order
        .client()
        .await
        .unwrap()
        .place_order(request)
        .await
        .unwrap()
        .into_inner();

    assert_eq!(receipt.payment_status, "declined");
}

#[tokio::test]
async fn test_order_health_is_public() {
    let (_payment, order) = spawn_pair().await;

    let response = order
        .client()
        .await
        .unwrap()
        .get_health(HealthRequest {})
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.status, "SERVING");
    assert_eq!(response.service, "order-service");
}
