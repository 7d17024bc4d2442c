//! Order Service
//!
//! Edge HTTP surface and order gRPC API for the order/payment example.
//!
//! # Servers
//!
//! - HTTP edge for clients (default: 0.0.0.0:8080)
//! - gRPC server for the order API (default: 0.0.0.0:50060)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment (fails fast on bad policy or keys)
//! 2. Initialize Prometheus metrics recorder
//! 3. Build the authorization layer for the order gRPC API
//! 4. Create the payment client (lazy connection)
//! 5. Start HTTP edge and gRPC server
//! 6. Wait for shutdown signal

#![warn(clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use order_service::config::Config;
use order_service::grpc::OrderGrpcService;
use order_service::observability::metrics::init_metrics_recorder;
use order_service::observability::DEFAULT_LOG_FILTER;
use order_service::routes::{build_routes, AppState};
use order_service::server::{serve_grpc, serve_http};
use order_service::services::{OrderProcessor, PaymentClient, PaymentClientTrait};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Order Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        http_bind_address = %config.http_bind_address,
        grpc_bind_address = %config.grpc_bind_address,
        payment_service_url = %config.payment_service_url,
        payment_rpc_timeout_seconds = config.payment_rpc_timeout.as_secs(),
        default_policy = ?config.auth.policy.default_policy,
        "Configuration loaded successfully"
    );

    let prometheus_handle = init_metrics_recorder().map_err(|e| {
        error!(error = %e, "Failed to install Prometheus metrics recorder");
        e
    })?;

    let auth_layer = config.auth.build_layer().map_err(|e| {
        error!(error = %e, "Failed to build authorization layer");
        e
    })?;

    let payment: Arc<dyn PaymentClientTrait> = Arc::new(
        PaymentClient::new(&config.payment_service_url, config.payment_rpc_timeout).map_err(
            |e| {
                error!(error = %e, "Failed to create payment client");
                e
            },
        )?,
    );
    let processor = OrderProcessor::new(payment);

    let shutdown_token = CancellationToken::new();

    // Bind both listeners before spawning to fail fast on bind errors
    let http_listener = tokio::net::TcpListener::bind(&config.http_bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.http_bind_address, "Failed to bind HTTP server");
            e
        })?;
    let grpc_listener = tokio::net::TcpListener::bind(&config.grpc_bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.grpc_bind_address, "Failed to bind gRPC server");
            e
        })?;

    let state = Arc::new(AppState {
        processor: processor.clone(),
    });
    let app = build_routes(state, prometheus_handle);
    let http_shutdown = shutdown_token.child_token();
    let http_task = tokio::spawn(async move {
        if let Err(e) = serve_http(http_listener, app, http_shutdown).await {
            error!(error = %e, "HTTP server failed");
        }
    });

    let service = OrderGrpcService::new(processor);
    let grpc_shutdown = shutdown_token.child_token();
    let grpc_task = tokio::spawn(async move {
        if let Err(e) = serve_grpc(grpc_listener, auth_layer, service, grpc_shutdown).await {
            error!(error = %e, "gRPC server failed");
        }
    });

    info!(
        http = %config.http_bind_address,
        grpc = %config.grpc_bind_address,
        "Order Service running"
    );

    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");
    shutdown_token.cancel();

    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        let _ = tokio::join!(http_task, grpc_task);
    })
    .await;
    if drained.is_err() {
        error!("Servers did not drain in time");
    }

    info!("Order Service shutdown complete");
    Ok(())
}

/// Initialize tracing. `LOG_FORMAT=json` switches to structured output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());

    let registry = tracing_subscriber::registry().with(filter);
    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        #[expect(
            clippy::expect_used,
            reason = "Signal handler installation is critical - panic is appropriate if it fails"
        )]
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
