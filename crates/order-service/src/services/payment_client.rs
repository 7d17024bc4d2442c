//! Payment Service gRPC client.
//!
//! Every call carries the caller's credential, attached by a
//! [`CredentialPropagator`] built for that call. The client never holds a
//! credential of its own.

use crate::errors::OrderError;
use common::credential::Credential;
use common::propagation::CredentialPropagator;
use proto_gen::payments::payment_service_client::PaymentServiceClient;
use proto_gen::payments::{ProcessPaymentRequest, ProcessPaymentResponse};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Status};
use tracing::{error, instrument, warn};

/// Default connect timeout in seconds.
const PAYMENT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Trait for payment client operations (enables mocking).
#[async_trait::async_trait]
pub trait PaymentClientTrait: Send + Sync {
    /// Charge an order on behalf of the holder of `credential`.
    async fn process_payment(
        &self,
        credential: &Credential,
        request: ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, OrderError>;
}

/// Payment client over a lazily connected channel.
#[derive(Debug, Clone)]
pub struct PaymentClient {
    channel: Channel,
}

impl PaymentClient {
    /// Create a client for `endpoint`. No connection is made until the first call.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Internal` if the endpoint URL is invalid.
    pub fn new(endpoint: &str, rpc_timeout: Duration) -> Result<Self, OrderError> {
        let channel = Endpoint::from_shared(endpoint.to_string())
            .map_err(|e| {
                error!(target: "order.services.payment_client", error = %e, endpoint = %endpoint, "Invalid payment endpoint");
                OrderError::Internal(format!("Invalid payment endpoint: {e}"))
            })?
            .connect_timeout(Duration::from_secs(PAYMENT_CONNECT_TIMEOUT_SECS))
            .timeout(rpc_timeout)
            .connect_lazy();

        Ok(Self { channel })
    }
}

#[async_trait::async_trait]
impl PaymentClientTrait for PaymentClient {
    #[instrument(skip_all, name = "order.services.payment_client.process_payment")]
    async fn process_payment(
        &self,
        credential: &Credential,
        request: ProcessPaymentRequest,
    ) -> Result<ProcessPaymentResponse, OrderError> {
        let propagator = CredentialPropagator::new(credential)?;
        let mut client = PaymentServiceClient::with_interceptor(self.channel.clone(), propagator);

        let response = client
            .process_payment(Request::new(request))
            .await
            .map_err(map_status)?;

        Ok(response.into_inner())
    }
}

/// Translate a downstream status into the order service's error space.
fn map_status(status: Status) -> OrderError {
    match status.code() {
        Code::Unauthenticated => OrderError::Unauthenticated,
        Code::InvalidArgument => OrderError::InvalidRequest(status.message().to_string()),
        Code::Unavailable | Code::DeadlineExceeded | Code::Cancelled => {
            warn!(target: "order.services.payment_client", code = ?status.code(), "Payment RPC failed");
            OrderError::PaymentUnavailable(status.message().to_string())
        }
        code => OrderError::Internal(format!("Payment RPC failed with {code:?}")),
    }
}

/// Mock payment client module for testing.
pub mod mock {
    use super::*;
    use proto_gen::payments::PaymentStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    enum Behavior {
        Respond(PaymentStatus),
        RejectCredential,
        Unavailable,
        Stall(std::time::Duration),
    }

    /// Mock payment client for unit testing.
    pub struct MockPaymentClient {
        behavior: Behavior,
        call_count: AtomicUsize,
        seen_credentials: Mutex<Vec<String>>,
    }

    impl MockPaymentClient {
        fn with_behavior(behavior: Behavior) -> Self {
            Self {
                behavior,
                call_count: AtomicUsize::new(0),
                seen_credentials: Mutex::new(Vec::new()),
            }
        }

        /// Create a mock that approves every payment.
        #[must_use]
        pub fn approving() -> Self {
            Self::with_behavior(Behavior::Respond(PaymentStatus::Approved))
        }

        /// Create a mock that declines every payment.
        #[must_use]
        pub fn declining() -> Self {
            Self::with_behavior(Behavior::Respond(PaymentStatus::Declined))
        }

        /// Create a mock whose responses carry no payment status.
        #[must_use]
        pub fn without_status() -> Self {
            Self::with_behavior(Behavior::Respond(PaymentStatus::Unspecified))
        }

        /// Create a mock that rejects the forwarded credential.
        #[must_use]
        pub fn rejecting_credential() -> Self {
            Self::with_behavior(Behavior::RejectCredential)
        }

        /// Create a mock that behaves as an unreachable service.
        #[must_use]
        pub fn unavailable() -> Self {
            Self::with_behavior(Behavior::Unavailable)
        }

        /// Create a mock that approves only after `delay`.
        #[must_use]
        pub fn stalled(delay: std::time::Duration) -> Self {
            Self::with_behavior(Behavior::Stall(delay))
        }

        /// Get the number of calls made.
        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }

        /// Credentials received, in call order.
        pub fn seen_credentials(&self) -> Vec<String> {
            self.seen_credentials
                .lock()
                .map(|seen| seen.clone())
                .unwrap_or_default()
        }
    }

    #[async_trait::async_trait]
    impl PaymentClientTrait for MockPaymentClient {
        async fn process_payment(
            &self,
            credential: &Credential,
            request: ProcessPaymentRequest,
        ) -> Result<ProcessPaymentResponse, OrderError> {
            self.call_count.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut seen) = self.seen_credentials.lock() {
                seen.push(credential.expose().to_string());
            }

            match self.behavior {
                Behavior::Respond(status) => Ok(ProcessPaymentResponse {
                    payment_id: format!("payment-for-{}", request.order_id),
                    status: status.into(),
                    charged_principal: "mock-principal".to_string(),
                }),
                Behavior::RejectCredential => Err(OrderError::Unauthenticated),
                Behavior::Unavailable => Err(OrderError::PaymentUnavailable(
                    "Mock payment client error".to_string(),
                )),
                Behavior::Stall(delay) => {
                    tokio::time::sleep(delay).await;
                    Ok(ProcessPaymentResponse {
                        payment_id: format!("payment-for-{}", request.order_id),
                        status: PaymentStatus::Approved.into(),
                        charged_principal: "mock-principal".to_string(),
                    })
                }
            }
        }
    }
}
