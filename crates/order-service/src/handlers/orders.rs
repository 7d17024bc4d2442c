//! Order handlers for the HTTP edge.
//!
//! - `POST /api/v1/orders` - place an order on behalf of the caller
//!
//! The edge does not validate the caller's token. It lifts the
//! `Authorization` header into a [`Credential`] and forwards it on the
//! payment call, where the payment service's authorization layer decides.

use crate::errors::OrderError;
use crate::routes::AppState;
use crate::services::{NewOrder, OrderReceipt};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use common::call_context::CallContext;
use common::credential::Credential;
use std::sync::Arc;
use tracing::instrument;

/// Handler for POST /api/v1/orders
///
/// # Response
///
/// - 201 Created with the order receipt
/// - 401 Unauthorized when the header is missing or the payment service
///   rejects the credential
/// - 400 Bad Request for invalid payloads
#[instrument(skip_all, name = "order.edge.create_order")]
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<NewOrder>, JsonRejection>,
) -> Result<(StatusCode, Json<OrderReceipt>), OrderError> {
    // Credential first, so an anonymous caller learns nothing about payload rules
    let credential = extract_credential(&headers)?;

    let Json(order) = payload.map_err(|e| OrderError::InvalidRequest(e.body_text()))?;

    let receipt = state.processor.place_order(&credential, order).await?;

    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Lift the caller's `Authorization` header into a credential.
fn extract_credential(headers: &HeaderMap) -> Result<Credential, OrderError> {
    CallContext::from_headers(headers)
        .authorization()
        .filter(|credential| !credential.is_empty())
        .ok_or(OrderError::MissingCredential)
}
