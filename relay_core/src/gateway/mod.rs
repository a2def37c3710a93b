// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Payment gateway client
//!
//! Outbound seam to the payment gateway's order API. The relay performs
//! exactly one gateway call per checkout attempt: order creation. Capture,
//! settlement and order expiry all happen on the gateway's side of the fence.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{order::Currency, Result};

pub mod mock;
pub mod razorpay;

pub use mock::MockGatewayClient;
pub use razorpay::RazorpayClient;

/// Body of the gateway order-creation call.
///
/// `payment_capture: 1` enables auto-capture: funds are captured immediately
/// on successful authorization, with no manual capture step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayOrderRequest {
    /// Amount in minor currency units.
    pub amount: i64,
    pub currency: Currency,
    /// Merchant-side bookkeeping token, unique with high probability.
    pub receipt: String,
    pub payment_capture: u8,
}

/// Order record as issued by the gateway. Immutable once created; consumed
/// at most once by a successful payment (the gateway enforces this, not us).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: Currency,
    pub receipt: String,
    pub status: String,
}

#[async_trait]
pub trait GatewayClient: Send + Sync {
    async fn create_order(&self, order: &GatewayOrderRequest) -> Result<GatewayOrder>;
}

#[async_trait]
impl<T: GatewayClient + ?Sized> GatewayClient for std::sync::Arc<T> {
    async fn create_order(&self, order: &GatewayOrderRequest) -> Result<GatewayOrder> {
        (**self).create_order(order).await
    }
}

#[async_trait]
impl<T: GatewayClient + ?Sized> GatewayClient for &T {
    async fn create_order(&self, order: &GatewayOrderRequest) -> Result<GatewayOrder> {
        (**self).create_order(order).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn order_request_serializes_to_the_gateway_wire_shape() {
        let request = GatewayOrderRequest {
            amount: 25_000,
            currency: Currency::Inr,
            receipt: "order_1755000000000_42".to_string(),
            payment_capture: 1,
        };

        let serialized = serde_json::to_value(&request).unwrap();
        assert_eq!(
            serialized,
            json!({
                "amount": 25_000,
                "currency": "INR",
                "receipt": "order_1755000000000_42",
                "payment_capture": 1,
            })
        );
    }

    #[test]
    fn gateway_order_deserializes_with_extra_fields_ignored() {
        let order: GatewayOrder = serde_json::from_value(json!({
            "id": "order_NVdzrSiBYfZYZR",
            "entity": "order",
            "amount": 25_000,
            "amount_paid": 0,
            "currency": "INR",
            "receipt": "order_1755000000000_42",
            "status": "created",
        }))
        .unwrap();

        assert_eq!(order.id, "order_NVdzrSiBYfZYZR");
        assert_eq!(order.amount, 25_000);
        assert_eq!(order.currency, Currency::Inr);
        assert_eq!(order.status, "created");
    }
}
