//! gRPC server wiring.
//!
//! The authorization layer wraps every route, so handlers only see calls
//! whose method policy has been satisfied.

use crate::grpc::PaymentGrpcService;
use common::grpc_auth::GrpcAuthLayer;
use proto_gen::payments::payment_service_server::PaymentServiceServer;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tracing::info;

/// Serve the payment gRPC API on `listener` until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns the transport error if the server fails.
pub async fn serve_grpc(
    listener: TcpListener,
    auth_layer: GrpcAuthLayer,
    service: PaymentGrpcService,
    shutdown: CancellationToken,
) -> Result<(), tonic::transport::Error> {
    let incoming = TcpListenerStream::new(listener);

    Server::builder()
        .layer(auth_layer)
        .add_service(PaymentServiceServer::new(service))
        .serve_with_incoming_shutdown(incoming, async move {
            shutdown.cancelled().await;
            info!(target: "payment.server", "gRPC server shutting down");
        })
        .await
}
