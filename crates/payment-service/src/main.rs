//! Payment Service
//!
//! Downstream gRPC service enforcing per-method authorization.
//!
//! # Servers
//!
//! - gRPC server for the payment API (default: 0.0.0.0:50061)
//! - HTTP server for health and metrics (default: 0.0.0.0:9091)
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment (fails fast on bad policy or keys)
//! 2. Initialize Prometheus metrics recorder
//! 3. Build the authorization layer
//! 4. Start health HTTP server
//! 5. Start gRPC server
//! 6. Wait for shutdown signal

#![warn(clippy::pedantic)]

use std::sync::Arc;
use std::time::Duration;

use payment_service::config::Config;
use payment_service::grpc::PaymentGrpcService;
use payment_service::observability::health::{health_router, HealthState};
use payment_service::observability::metrics::init_metrics_recorder;
use payment_service::observability::DEFAULT_LOG_FILTER;
use payment_service::server::serve_grpc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    info!("Starting Payment Service");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        grpc_bind_address = %config.grpc_bind_address,
        metrics_bind_address = %config.metrics_bind_address,
        approval_limit_cents = config.approval_limit_cents,
        protected_methods = config.auth.policy.protected_methods.len(),
        public_methods = config.auth.policy.public_methods.len(),
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

    let health_state = Arc::new(HealthState::new());
    let shutdown_token = CancellationToken::new();

    // Bind both listeners before spawning to fail fast on bind errors
    let health_listener = tokio::net::TcpListener::bind(&config.metrics_bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.metrics_bind_address, "Failed to bind health server");
            e
        })?;
    let grpc_listener = tokio::net::TcpListener::bind(&config.grpc_bind_address)
        .await
        .map_err(|e| {
            error!(error = %e, addr = %config.grpc_bind_address, "Failed to bind gRPC server");
            e
        })?;

    let app = health_router(Arc::clone(&health_state), prometheus_handle);
    let health_shutdown = shutdown_token.child_token();
    tokio::spawn(async move {
        let server = axum::serve(health_listener, app).with_graceful_shutdown(async move {
            health_shutdown.cancelled().await;
            info!("Health server shutting down");
        });
        if let Err(e) = server.await {
            error!(error = %e, "Health server failed");
        }
    });

    let service = PaymentGrpcService::new(config.approval_limit_cents);
    let grpc_shutdown = shutdown_token.child_token();
    let grpc_task = tokio::spawn(async move {
        if let Err(e) = serve_grpc(grpc_listener, auth_layer, service, grpc_shutdown).await {
            error!(error = %e, "gRPC server failed");
        }
    });

    health_state.set_ready();
    info!(addr = %config.grpc_bind_address, "Payment Service running");

    shutdown_signal().await;

    info!("Shutdown signal received, initiating graceful shutdown...");
    health_state.set_not_ready();
    shutdown_token.cancel();

    if tokio::time::timeout(Duration::from_secs(10), grpc_task)
        .await
        .is_err()
    {
        error!("gRPC server did not drain in time");
    }

    info!("Payment Service shutdown complete");
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
