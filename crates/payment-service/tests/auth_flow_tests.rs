//! Payment service authorization tests against a real server.
//!
//! Every test spawns a payment server on an ephemeral port and talks to it
//! over a real tonic channel, so metadata travels through HTTP/2 exactly as
//! in production.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use auth_test_utils::{
    payment_auth_vars, tamper_signature, test_public_key_pem, TestPaymentServer,
    TestTokenBuilder, TEST_HMAC_SECRET,
};
use common::credential::Credential;
use common::propagation::{wrap, CredentialPropagator};
use proto_gen::payments::payment_service_client::PaymentServiceClient;
use proto_gen::payments::{HealthRequest, PaymentStatus, ProcessPaymentRequest};
use tonic::metadata::MetadataValue;
use tonic::{Code, Request};

fn payment_request(amount_cents: i64) -> ProcessPaymentRequest {
    ProcessPaymentRequest {
        order_id: "6f1d1f8e-3b0c-4b5e-9f57-2a4f1d2c9e10".to_string(),
        amount_cents,
        currency: "USD".to_string(),
    }
}

fn with_raw_authorization(value: &'static str) -> Request<ProcessPaymentRequest> {
    let mut request = Request::new(payment_request(500));
    request
        .metadata_mut()
        .insert("authorization", MetadataValue::from_static(value));
    request
}

// ============================================================================
// Scenario A: protected method, valid credential -> dispatched
// ============================================================================

#[tokio::test]
async fn test_valid_credential_reaches_handler() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let credential = TestTokenBuilder::new().for_subject("alice").bearer_hs256();

    let propagator = CredentialPropagator::new(&credential).unwrap();
    let mut client =
        PaymentServiceClient::with_interceptor(server.channel().await.unwrap(), propagator);

    let response = client
        .process_payment(payment_request(500))
        .await
        .expect("valid credential should be dispatched")
        .into_inner();

    assert_eq!(response.status(), PaymentStatus::Approved);
    assert_eq!(response.charged_principal, "alice");
}

// ============================================================================
// Scenario B: protected method, no credential -> UNAUTHENTICATED
// ============================================================================

#[tokio::test]
async fn test_missing_credential_is_unauthenticated() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let mut client = server.client().await.unwrap();

    let status = client
        .process_payment(payment_request(500))
        .await
        .expect_err("call without credential must be rejected");

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication required");
}

// ============================================================================
// Scenario C: credential without the Bearer prefix -> UNAUTHENTICATED
// ============================================================================

#[tokio::test]
async fn test_credential_without_bearer_prefix_is_unauthenticated() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let mut client = server.client().await.unwrap();

    let status = client
        .process_payment(with_raw_authorization("good-token"))
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
}

// ============================================================================
// Scenario D: public method, no credential -> dispatched
// ============================================================================

#[tokio::test]
async fn test_public_method_without_credential_is_dispatched() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let mut client = server.client().await.unwrap();

    let response = client
        .get_health(HealthRequest {})
        .await
        .expect("public method should be dispatched")
        .into_inner();

    assert_eq!(response.status, "SERVING");
    assert_eq!(response.service, "payment-service");
}

#[tokio::test]
async fn test_public_method_ignores_garbage_credential() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let mut client = server.client().await.unwrap();

    let mut request = Request::new(HealthRequest {});
    request
        .metadata_mut()
        .insert("authorization", MetadataValue::from_static("Bearer garbage"));

    assert!(client.get_health(request).await.is_ok());
}

// ============================================================================
// Scenario E: expired one second ago -> UNAUTHENTICATED
// ============================================================================

#[tokio::test]
async fn test_expired_credential_is_unauthenticated() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let credential = TestTokenBuilder::new().expires_in(-1).bearer_hs256();

    let request = wrap(Request::new(payment_request(500)), &credential).unwrap();
    let mut client = server.client().await.unwrap();

    let status = client.process_payment(request).await.unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication required");
}

// ============================================================================
// Other rejection reasons collapse to the same status
// ============================================================================

#[tokio::test]
async fn test_tampered_signature_is_unauthenticated() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let token = TestTokenBuilder::new().sign_hs256(TEST_HMAC_SECRET.as_bytes());
    let credential = Credential::bearer(&tamper_signature(&token));

    let request = wrap(Request::new(payment_request(500)), &credential).unwrap();
    let status = server
        .client()
        .await
        .unwrap()
        .process_payment(request)
        .await
        .unwrap_err();

    assert_eq!(status.code(), Code::Unauthenticated);
    assert_eq!(status.message(), "Authentication required");
}

#[tokio::test]
async fn test_untrusted_issuer_is_unauthenticated() {
    let mut vars = payment_auth_vars();
    vars.insert(
        "AUTH_TRUSTED_ISSUERS".to_string(),
        "https://idp.checkpoint.test".to_string(),
    );
    let server = TestPaymentServer::spawn(vars).await.unwrap();

    let trusted = TestTokenBuilder::new()
        .issued_by("https://idp.checkpoint.test")
        .bearer_hs256();
    let untrusted = TestTokenBuilder::new()
        .issued_by("https://evil.test")
        .bearer_hs256();

    let mut client = server.client().await.unwrap();
    let ok = wrap(Request::new(payment_request(500)), &trusted).unwrap();
    assert!(client.process_payment(ok).await.is_ok());

    let rejected = wrap(Request::new(payment_request(500)), &untrusted).unwrap();
    let status = client.process_payment(rejected).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
}

#[tokio::test]
async fn test_revoked_token_is_unauthenticated() {
    let mut vars = payment_auth_vars();
    vars.insert("AUTH_REVOKED_TOKEN_IDS".to_string(), "jti-stolen".to_string());
    let server = TestPaymentServer::spawn(vars).await.unwrap();
    let mut client = server.client().await.unwrap();

    let revoked = TestTokenBuilder::new().with_jti("jti-stolen").bearer_hs256();
    let request = wrap(Request::new(payment_request(500)), &revoked).unwrap();
    assert_eq!(
        client.process_payment(request).await.unwrap_err().code(),
        Code::Unauthenticated
    );

    let fine = TestTokenBuilder::new().with_jti("jti-fine").bearer_hs256();
    let request = wrap(Request::new(payment_request(500)), &fine).unwrap();
    assert!(client.process_payment(request).await.is_ok());
}

// ============================================================================
// Default policy for unregistered methods
// ============================================================================

#[tokio::test]
async fn test_fail_closed_rejects_unregistered_method() {
    // GetHealth is left out of the registry, so the default policy decides
    let mut vars = payment_auth_vars();
    vars.remove("AUTH_PUBLIC_METHODS");
    let server = TestPaymentServer::spawn(vars).await.unwrap();
    let mut client = server.client().await.unwrap();

    let status = client.get_health(HealthRequest {}).await.unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);

    // A valid credential satisfies the fail-closed default
    let credential = TestTokenBuilder::new().bearer_hs256();
    let request = wrap(Request::new(HealthRequest {}), &credential).unwrap();
    assert!(client.get_health(request).await.is_ok());
}

#[tokio::test]
async fn test_fail_open_dispatches_unregistered_method() {
    let mut vars = payment_auth_vars();
    vars.remove("AUTH_PUBLIC_METHODS");
    vars.insert("AUTH_DEFAULT_POLICY".to_string(), "fail-open".to_string());
    let server = TestPaymentServer::spawn(vars).await.unwrap();
    let mut client = server.client().await.unwrap();

    assert!(client.get_health(HealthRequest {}).await.is_ok());

    // Registered methods are unaffected by the default
    let status = client
        .process_payment(payment_request(500))
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unauthenticated);
}

// ============================================================================
// Ed25519 trust anchor
// ============================================================================

#[tokio::test]
async fn test_ed25519_trust_anchor() {
    let mut vars = payment_auth_vars();
    vars.remove("AUTH_HMAC_SECRET");
    vars.insert(
        "AUTH_ED25519_PUBLIC_KEY_PEM".to_string(),
        test_public_key_pem(1),
    );
    let server = TestPaymentServer::spawn(vars).await.unwrap();
    let mut client = server.client().await.unwrap();

    let good = TestTokenBuilder::new().for_subject("bob").bearer_ed25519(1);
    let request = wrap(Request::new(payment_request(500)), &good).unwrap();
    let response = client.process_payment(request).await.unwrap().into_inner();
    assert_eq!(response.charged_principal, "bob");

    // Signed by a different key
    let wrong_key = TestTokenBuilder::new().bearer_ed25519(2);
    let request = wrap(Request::new(payment_request(500)), &wrong_key).unwrap();
    assert_eq!(
        client.process_payment(request).await.unwrap_err().code(),
        Code::Unauthenticated
    );

    // HS256 token against an EdDSA anchor
    let wrong_alg = TestTokenBuilder::new().bearer_hs256();
    let request = wrap(Request::new(payment_request(500)), &wrong_alg).unwrap();
    assert_eq!(
        client.process_payment(request).await.unwrap_err().code(),
        Code::Unauthenticated
    );
}

// ============================================================================
// Handler behavior once authorized
// ============================================================================

#[tokio::test]
async fn test_authorized_call_can_still_be_declined() {
    let mut vars = payment_auth_vars();
    vars.insert("PAYMENT_APPROVAL_LIMIT_CENTS".to_string(), "1000".to_string());
    let server = TestPaymentServer::spawn(vars).await.unwrap();
    let credential = TestTokenBuilder::new().bearer_hs256();

    let request = wrap(Request::new(payment_request(1001)), &credential).unwrap();
    let response = server
        .client()
        .await
        .unwrap()
        .process_payment(request)
        .await
        .unwrap()
        .into_inner();

    assert_eq!(response.status(), PaymentStatus::Declined);
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let server = TestPaymentServer::spawn(payment_auth_vars()).await.unwrap();
    let channel = server.channel().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let channel = channel.clone();
        handles.push(tokio::spawn(async move {
            let mut client = PaymentServiceClient::new(channel);
            let mut request = Request::new(payment_request(100));
            if i % 2 == 0 {
                let credential = TestTokenBuilder::new()
                    .for_subject(&format!("user-{i}"))
                    .bearer_hs256();
                request = wrap(request, &credential).unwrap();
            }
            (i, client.process_payment(request).await)
        }));
    }

    for handle in handles {
        let (i, result) = handle.await.unwrap();
        if i % 2 == 0 {
            assert_eq!(result.unwrap().into_inner().charged_principal, format!("user-{i}"));
        } else {
            assert_eq!(result.unwrap_err().code(), Code::Unauthenticated);
        }
    }
}
