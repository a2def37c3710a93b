// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Order creation
//!
//! Turns a client-side cart into a gateway order. The order request is
//! ephemeral: it exists for one checkout attempt and is discarded once the
//! gateway order is issued. The completeness gate runs before anything else,
//! so an incomplete request never produces gateway traffic.

use std::{str::FromStr, sync::Arc};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    config::GatewayConfig,
    gateway::{GatewayClient, GatewayOrderRequest},
    guard::PendingOrderGuard,
    Error, Result,
};

/// Minor units per major unit. Fixed for the currency in use; there is no
/// rounding or locale logic beyond integer truncation of the product.
const MINOR_UNITS_PER_MAJOR: f64 = 100.0;

/// Settlement currency. The gateway contract pins this to INR.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum Currency {
    #[strum(serialize = "INR")]
    Inr,
}

// We implement our own Serialize and Deserialize traits for `Currency`
// because the ones derived by `serde` serialize the enum member names as
// strings (eg. "Inr"), while we want to serialize them using the variant
// strings we set through `strum` (eg. "INR").

impl serde::ser::Serialize for Currency {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> serde::de::Deserialize<'de> for Currency {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Currency, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Currency::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// One cart line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price in major currency units.
    pub price: f64,
}

/// Client-constructed request for one checkout attempt.
///
/// `total_amount` stays optional at the type level so the completeness gate,
/// not deserialization, decides what an absent amount means.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(default)]
    pub items: Vec<OrderItem>,
    /// Cart total in major currency units.
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub user_id: String,
}

/// Successful order creation, echoed back to the browser so it can open the
/// gateway's hosted checkout. `key_id` is the publishable key; the secret
/// never appears here.
#[derive(Debug, Clone, Serialize)]
pub struct CreatedOrder {
    pub order_id: String,
    /// Cart total in major currency units, as submitted.
    pub amount: f64,
    pub currency: Currency,
    pub key_id: String,
    pub items: Vec<OrderItem>,
    pub user_id: String,
    pub receipt: String,
}

/// Converts a major-unit amount to the gateway's integer minor units,
/// truncating the product.
pub fn to_minor_units(total_amount: f64) -> i64 {
    (total_amount * MINOR_UNITS_PER_MAJOR) as i64
}

/// Builds the merchant-side bookkeeping token:
/// `"order_{epoch_millis}_{suffix}"` with a random suffix below 10000.
///
/// Unique with high probability per merchant account; a collision is possible
/// and operationally negligible. Not a uniqueness or security guarantee: the
/// token never participates in signature verification.
pub fn new_receipt_token() -> Result<String> {
    let millis = crate::current_epoch_millis()?;
    let suffix: u32 = rand::rng().random_range(0..10_000);
    Ok(format!("order_{millis}_{suffix}"))
}

/// Creates gateway orders on behalf of checkout attempts.
pub struct OrderService<G> {
    gateway: G,
    config: Arc<GatewayConfig>,
    guard: Option<PendingOrderGuard>,
}

impl<G: GatewayClient> OrderService<G> {
    pub fn new(gateway: G, config: Arc<GatewayConfig>) -> Self {
        Self {
            gateway,
            config,
            guard: None,
        }
    }

    /// Enables the at-most-one-pending-order-per-user constraint.
    pub fn with_pending_order_guard(mut self, guard: PendingOrderGuard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Creates a gateway order for `request`.
    ///
    /// The completeness gate runs first: an empty item list or an absent
    /// total returns [`Error::IncompleteData`] with no gateway call made.
    /// Gateway failures come back as [`Error::Gateway`] wrapping the
    /// gateway's own message. One outbound call, no local persistence.
    pub async fn create_order(&self, request: &OrderRequest) -> Result<CreatedOrder> {
        if request.items.is_empty() {
            return Err(Error::IncompleteData { field: "items" });
        }
        let total_amount = request
            .total_amount
            .ok_or(Error::IncompleteData {
                field: "total_amount",
            })?;

        if let Some(guard) = &self.guard {
            guard.try_reserve(&request.user_id)?;
        }

        let order = GatewayOrderRequest {
            amount: to_minor_units(total_amount),
            currency: Currency::Inr,
            receipt: new_receipt_token()?,
            payment_capture: 1,
        };

        let created = match self.gateway.create_order(&order).await {
            Ok(created) => created,
            Err(err) => {
                log::error!("order creation failed for user {}: {err}", request.user_id);
                // A failed attempt holds no reservation; the user may retry.
                if let Some(guard) = &self.guard {
                    guard.release(&request.user_id);
                }
                return Err(err);
            }
        };

        Ok(CreatedOrder {
            order_id: created.id,
            amount: total_amount,
            currency: created.currency,
            key_id: self.config.key_id().to_string(),
            items: request.items.clone(),
            user_id: request.user_id.clone(),
            receipt: created.receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::*;

    use super::*;
    use crate::gateway::MockGatewayClient;

    fn config() -> Arc<GatewayConfig> {
        Arc::new(GatewayConfig::new("rzp_test_key", "test_secret").unwrap())
    }

    fn cart(total_amount: Option<f64>) -> OrderRequest {
        OrderRequest {
            items: vec![OrderItem {
                name: "Annual subscription".to_string(),
                quantity: 1,
                price: 250.0,
            }],
            total_amount,
            user_id: "u1".to_string(),
        }
    }

    #[test]
    fn currency_serializes_to_its_iso_code() {
        assert_eq!(serde_json::to_string(&Currency::Inr).unwrap(), "\"INR\"");
        let parsed: Currency = serde_json::from_str("\"INR\"").unwrap();
        assert_eq!(parsed, Currency::Inr);
    }

    #[rstest]
    #[case::whole_major_units(250.0, 25_000)]
    #[case::fractional_major_units(99.99, 9_999)]
    #[case::truncates_sub_minor_remainder(10.999, 1_099)]
    #[case::zero(0.0, 0)]
    fn amount_conversion_truncates_to_minor_units(#[case] major: f64, #[case] minor: i64) {
        assert_eq!(to_minor_units(major), minor);
    }

    #[test]
    fn receipt_token_has_timestamp_and_bounded_suffix() {
        let token = new_receipt_token().unwrap();

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "order");
        assert!(parts[1].parse::<u64>().is_ok());
        assert!(parts[2].parse::<u32>().unwrap() < 10_000);
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_without_a_gateway_call() {
        let gateway = MockGatewayClient::new();
        let service = OrderService::new(&gateway, config());

        let request = OrderRequest {
            items: vec![],
            total_amount: None,
            user_id: "u1".to_string(),
        };
        let result = service.create_order(&request).await;

        assert!(matches!(
            result,
            Err(Error::IncompleteData { field: "items" })
        ));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn absent_total_is_rejected_without_a_gateway_call() {
        let gateway = MockGatewayClient::new();
        let service = OrderService::new(&gateway, config());

        let result = service.create_order(&cart(None)).await;

        assert!(matches!(
            result,
            Err(Error::IncompleteData {
                field: "total_amount"
            })
        ));
        assert_eq!(gateway.call_count(), 0);
    }

    #[tokio::test]
    async fn gateway_receives_minor_units_and_auto_capture() {
        let gateway = MockGatewayClient::new().with_order_id("order_abc");
        let service = OrderService::new(&gateway, config());

        let created = service.create_order(&cart(Some(250.0))).await.unwrap();

        let sent = gateway.last_request().unwrap();
        assert_eq!(sent.amount, 25_000);
        assert_eq!(sent.currency, Currency::Inr);
        assert_eq!(sent.payment_capture, 1);

        assert_eq!(created.order_id, "order_abc");
        assert_eq!(created.amount, 250.0);
        assert_eq!(created.key_id, "rzp_test_key");
        assert_eq!(created.user_id, "u1");
        assert_eq!(created.items.len(), 1);
    }

    #[tokio::test]
    async fn gateway_message_is_wrapped_unaltered() {
        let gateway = MockGatewayClient::failing_with("Authentication failed");
        let service = OrderService::new(&gateway, config());

        let result = service.create_order(&cart(Some(250.0))).await;

        match result {
            Err(Error::Gateway { message }) => assert_eq!(message, "Authentication failed"),
            other => panic!("expected gateway error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn pending_order_guard_rejects_a_second_live_order() {
        let gateway = MockGatewayClient::new();
        let service = OrderService::new(&gateway, config())
            .with_pending_order_guard(PendingOrderGuard::new(Duration::from_secs(60)));

        service.create_order(&cart(Some(250.0))).await.unwrap();
        let second = service.create_order(&cart(Some(250.0))).await;

        assert!(matches!(second, Err(Error::PendingOrderExists { .. })));
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn guard_reservation_is_released_on_gateway_failure() {
        let gateway = MockGatewayClient::failing_with("quota exceeded");
        let service = OrderService::new(&gateway, config())
            .with_pending_order_guard(PendingOrderGuard::new(Duration::from_secs(60)));

        let first = service.create_order(&cart(Some(250.0))).await;
        assert!(matches!(first, Err(Error::Gateway { .. })));

        // The failed attempt must not hold the user's slot.
        let second = service.create_order(&cart(Some(250.0))).await;
        assert!(matches!(second, Err(Error::Gateway { .. })));
        assert_eq!(gateway.call_count(), 2);
    }
}
