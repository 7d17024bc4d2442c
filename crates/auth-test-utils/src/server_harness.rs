//! Test server harness for E2E testing
//!
//! Spawns real payment and order servers on ephemeral ports with the same
//! wiring their binaries use. Each server stops when its harness is dropped.

use crate::crypto_fixtures::TEST_HMAC_SECRET;
use metrics_exporter_prometheus::PrometheusBuilder;
use order_service::routes::{build_routes, AppState};
use order_service::services::{OrderProcessor, PaymentClient, PaymentClientTrait};
use proto_gen::orders::order_service_client::OrderServiceClient;
use proto_gen::payments::payment_service_client::PaymentServiceClient;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tonic::transport::Channel;

/// Fully qualified payment method ids.
pub const PROCESS_PAYMENT: &str = "payments.PaymentService/ProcessPayment";
pub const PAYMENT_GET_HEALTH: &str = "payments.PaymentService/GetHealth";

/// Fully qualified order method ids.
pub const PLACE_ORDER: &str = "orders.OrderService/PlaceOrder";
pub const ORDER_GET_HEALTH: &str = "orders.OrderService/GetHealth";

/// Time given to spawned servers to start accepting.
const STARTUP_DELAY: Duration = Duration::from_millis(50);

/// Auth variables for a payment server trusting [`TEST_HMAC_SECRET`].
pub fn payment_auth_vars() -> HashMap<String, String> {
    HashMap::from([
        ("AUTH_HMAC_SECRET".to_string(), TEST_HMAC_SECRET.to_string()),
        ("AUTH_PROTECTED_METHODS".to_string(), PROCESS_PAYMENT.to_string()),
        ("AUTH_PUBLIC_METHODS".to_string(), PAYMENT_GET_HEALTH.to_string()),
    ])
}

/// Auth variables for an order server trusting [`TEST_HMAC_SECRET`].
pub fn order_auth_vars() -> HashMap<String, String> {
    HashMap::from([
        ("AUTH_HMAC_SECRET".to_string(), TEST_HMAC_SECRET.to_string()),
        ("AUTH_PROTECTED_METHODS".to_string(), PLACE_ORDER.to_string()),
        ("AUTH_PUBLIC_METHODS".to_string(), ORDER_GET_HEALTH.to_string()),
    ])
}

async fn bind_ephemeral() -> Result<(TcpListener, SocketAddr), anyhow::Error> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;
    let addr = listener
        .local_addr()
        .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;
    Ok((listener, addr))
}

/// Test harness for a running payment service.
///
/// # Example
/// ```rust,ignore
/// let server = TestPaymentServer::spawn(payment_auth_vars()).await?;
/// let mut client = server.client().await?;
/// ```
pub struct TestPaymentServer {
    addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestPaymentServer {
    /// Spawn a payment server configured from `vars`.
    ///
    /// Bind addresses in `vars` are ignored; the server listens on 127.0.0.1:0.
    pub async fn spawn(vars: HashMap<String, String>) -> Result<Self, anyhow::Error> {
        let config = payment_service::config::Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Invalid payment config: {}", e))?;
        let layer = config
            .auth
            .build_layer()
            .map_err(|e| anyhow::anyhow!("Invalid auth config: {}", e))?;
        let service =
            payment_service::grpc::PaymentGrpcService::new(config.approval_limit_cents);

        let (listener, addr) = bind_ephemeral().await?;
        let shutdown = CancellationToken::new();
        let server_shutdown = shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) =
                payment_service::server::serve_grpc(listener, layer, service, server_shutdown).await
            {
                eprintln!("Test payment server error: {}", e);
            }
        });

        tokio::time::sleep(STARTUP_DELAY).await;

        Ok(Self { addr, shutdown })
    }

    /// Get the server's socket address
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the server's base URL (http://127.0.0.1:port)
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Connect a plain client (no interceptor).
    pub async fn client(&self) -> Result<PaymentServiceClient<Channel>, anyhow::Error> {
        PaymentServiceClient::connect(self.url())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to payment server: {}", e))
    }

    /// Connect a channel, for clients built with an interceptor.
    pub async fn channel(&self) -> Result<Channel, anyhow::Error> {
        Channel::from_shared(self.url())
            .map_err(|e| anyhow::anyhow!("Invalid payment server URL: {}", e))?
            .connect()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to payment server: {}", e))
    }
}

impl Drop for TestPaymentServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Test harness for a running order service (HTTP edge and gRPC API).
pub struct TestOrderServer {
    http_addr: SocketAddr,
    grpc_addr: SocketAddr,
    shutdown: CancellationToken,
}

impl TestOrderServer {
    /// Spawn an order server configured from `vars`, calling the payment
    /// service at `payment_url`.
    pub async fn spawn(
        mut vars: HashMap<String, String>,
        payment_url: &str,
    ) -> Result<Self, anyhow::Error> {
        vars.insert("PAYMENT_SERVICE_URL".to_string(), payment_url.to_string());
        let config = order_service::config::Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Invalid order config: {}", e))?;
        let layer = config
            .auth
            .build_layer()
            .map_err(|e| anyhow::anyhow!("Invalid auth config: {}", e))?;

        let payment: Arc<dyn PaymentClientTrait> = Arc::new(
            PaymentClient::new(&config.payment_service_url, config.payment_rpc_timeout)
                .map_err(|e| anyhow::anyhow!("Failed to create payment client: {}", e))?,
        );
        let processor = OrderProcessor::new(payment);

        // Standalone recorder; the global one may already be installed by another test
        let metrics_handle = PrometheusBuilder::new().build_recorder().handle();
        let app = build_routes(
            Arc::new(AppState {
                processor: processor.clone(),
            }),
            metrics_handle,
        );
        let service = order_service::grpc::OrderGrpcService::new(processor);

        let (http_listener, http_addr) = bind_ephemeral().await?;
        let (grpc_listener, grpc_addr) = bind_ephemeral().await?;
        let shutdown = CancellationToken::new();

        let http_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = order_service::server::serve_http(http_listener, app, http_shutdown).await
            {
                eprintln!("Test order HTTP server error: {}", e);
            }
        });

        let grpc_shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) =
                order_service::server::serve_grpc(grpc_listener, layer, service, grpc_shutdown).await
            {
                eprintln!("Test order gRPC server error: {}", e);
            }
        });

        tokio::time::sleep(STARTUP_DELAY).await;

        Ok(Self {
            http_addr,
            grpc_addr,
            shutdown,
        })
    }

    /// Base URL of the HTTP edge
    pub fn http_url(&self) -> String {
        format!("http://{}", self.http_addr)
    }

    /// Base URL of the order gRPC API
    pub fn grpc_url(&self) -> String {
        format!("http://{}", self.grpc_addr)
    }

    /// Connect a channel to the order gRPC API.
    pub async fn channel(&self) -> Result<Channel, anyhow::Error> {
        Channel::from_shared(self.grpc_url())
            .map_err(|e| anyhow::anyhow!("Invalid order server URL: {}", e))?
            .connect()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to order server: {}", e))
    }

    /// Connect a plain client (no interceptor).
    pub async fn client(&self) -> Result<OrderServiceClient<Channel>, anyhow::Error> {
        Ok(OrderServiceClient::new(self.channel().await?))
    }
}

impl Drop for TestOrderServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
