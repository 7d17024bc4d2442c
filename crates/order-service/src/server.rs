//! Server wiring for the order service.
//!
//! The order gRPC API sits behind the shared authorization layer; the HTTP
//! edge does not, it forwards whatever the caller presented.

use crate::grpc::OrderGrpcService;
use common::grpc_auth::GrpcAuthLayer;
use proto_gen::orders::order_service_server::OrderServiceServer;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

/// Serve the order gRPC API on `listener` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns the transport error if the server fails.
pub async fn serve_grpc(
    listener: TcpListener,
    auth_layer: GrpcAuthLayer,
    service: OrderGrpcService,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    let incoming = TcpListenerStream::new(listener);

    Server::builder()
        .layer(auth_layer)
        .add_service(OrderServiceServer::new(service))
        .serve_with_incoming_shutdown(incoming, async move {
            shutdown.cancelled().await;
            info!(target: "order.server", "gRPC server shutting down");
        })
        .await
}

/// Serve the HTTP edge on `listener` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns the I/O error if the server fails.
pub async fn serve_http(
    listener: TcpListener,
    app: axum::Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!(target: "order.server", "HTTP server shutting down");
        })
        .await
}
