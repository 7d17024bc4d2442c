//! Order placement.
//!
//! The processor takes the credential of whoever is placing the order and
//! hands it to the payment client unchanged. It does not validate the
//! credential; the payment service does.

use crate::errors::OrderError;
use crate::observability::metrics;
use crate::services::payment_client::PaymentClientTrait;
use common::credential::Credential;
use common::types::OrderId;
use proto_gen::payments::{PaymentStatus, ProcessPaymentRequest};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// An order as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOrder {
    pub item_sku: String,
    pub quantity: u32,
    pub amount_cents: i64,
    pub currency: String,
}

/// Result of placing an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderReceipt {
    pub order_id: String,
    pub payment_id: String,
    /// `"approved"` or `"declined"`.
    pub payment_status: String,
    pub charged_principal: String,
}

/// Places orders and charges them through the payment service.
#[derive(Clone)]
pub struct OrderProcessor {
    payment: Arc<dyn PaymentClientTrait>,
}

impl OrderProcessor {
    #[must_use]
    pub fn new(payment: Arc<dyn PaymentClientTrait>) -> Self {
        Self { payment }
    }

    /// Place `order`, charging it with `credential`.
    ///
    /// # Errors
    ///
    /// - `OrderError::InvalidRequest` - the order payload is invalid
    /// - `OrderError::Unauthenticated` - the payment service rejected the credential
    /// - `OrderError::Propagation` - the credential could not be forwarded
    /// - `OrderError::PaymentUnavailable` - the payment service is unreachable
    #[instrument(skip_all, name = "order.services.place_order")]
    pub async fn place_order(
        &self,
        credential: &Credential,
        order: NewOrder,
    ) -> Result<OrderReceipt, OrderError> {
        let result = self.place(credential, order).await;
        let outcome = match &result {
            Ok(receipt) => receipt.payment_status.as_str(),
            Err(_) => "error",
        };
        metrics::record_order_placed(outcome);
        result
    }

    async fn place(&self, credential: &Credential, order: NewOrder) -> Result<OrderReceipt, OrderError> {
        validate(&order)?;

        let order_id = OrderId::new();
        let response = self
            .payment
            .process_payment(
                credential,
                ProcessPaymentRequest {
                    order_id: order_id.to_string(),
                    amount_cents: order.amount_cents,
                    currency: order.currency,
                },
            )
            .await?;

        let payment_status = match response.status() {
            PaymentStatus::Approved => "approved",
            PaymentStatus::Declined => "declined",
            PaymentStatus::Unspecified => {
                return Err(OrderError::Internal(
                    "Payment service returned no status".to_string(),
                ))
            }
        };

        info!(
            target: "order.services.order_processor",
            order_id = %order_id,
            payment_id = %response.payment_id,
            payment_status = payment_status,
            "Order placed"
        );

        Ok(OrderReceipt {
            order_id: order_id.to_string(),
            payment_id: response.payment_id,
            payment_status: payment_status.to_string(),
            charged_principal: response.charged_principal,
        })
    }
}

fn validate(order: &NewOrder) -> Result<(), OrderError> {
    if order.item_sku.trim().is_empty() {
        return Err(OrderError::InvalidRequest("item_sku is required".to_string()));
    }
    if order.quantity == 0 {
        return Err(OrderError::InvalidRequest(
            "quantity must be positive".to_string(),
        ));
    }
    if order.amount_cents <= 0 {
        return Err(OrderError::InvalidRequest(
            "amount_cents must be positive".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::services::payment_client::mock::MockPaymentClient;

    fn order() -> NewOrder {
        NewOrder {
            item_sku: "SKU-1".to_string(),
            quantity: 2,
            amount_cents: 4_200,
            currency: "USD".to_string(),
        }
    }

    fn processor(mock: &Arc<MockPaymentClient>) -> OrderProcessor {
        OrderProcessor::new(Arc::clone(mock) as Arc<dyn PaymentClientTrait>)
    }

    #[tokio::test]
    async fn test_place_order_forwards_credential_verbatim() {
        let mock = Arc::new(MockPaymentClient::approving());
        let credential = Credential::new("Bearer abc.def.ghi");

        let receipt = processor(&mock).place_order(&credential, order()).await.unwrap();

        assert_eq!(receipt.payment_status, "approved");
        assert!(receipt.order_id.parse::<OrderId>().is_ok());
        assert_eq!(mock.seen_credentials(), vec!["Bearer abc.def.ghi".to_string()]);
    }

    #[tokio::test]
    async fn test_place_order_declined() {
        let mock = Arc::new(MockPaymentClient::declining());

        let receipt = processor(&mock)
            .place_order(&Credential::bearer("abc"), order())
            .await
            .unwrap();

        assert_eq!(receipt.payment_status, "declined");
    }

    #[tokio::test]
    async fn test_place_order_invalid_payload_never_calls_payment() {
        let mock = Arc::new(MockPaymentClient::approving());
        let invalid = [
            NewOrder {
                item_sku: "  ".to_string(),
                ..order()
            },
            NewOrder {
                quantity: 0,
                ..order()
            },
            NewOrder {
                amount_cents: 0,
                ..order()
            },
        ];

        for bad in invalid {
            let result = processor(&mock)
                .place_order(&Credential::bearer("abc"), bad)
                .await;
            assert!(matches!(result, Err(OrderError::InvalidRequest(_))));
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_place_order_downstream_rejection() {
        let mock = Arc::new(MockPaymentClient::rejecting_credential());

        let result = processor(&mock)
            .place_order(&Credential::bearer("stolen"), order())
            .await;

        assert!(matches!(result, Err(OrderError::Unauthenticated)));
    }

    #[tokio::test]
    async fn test_place_order_missing_status_is_internal() {
        let mock = Arc::new(MockPaymentClient::without_status());

        let result = processor(&mock)
            .place_order(&Credential::bearer("abc"), order())
            .await;

        assert!(matches!(result, Err(OrderError::Internal(_))));
    }
}
