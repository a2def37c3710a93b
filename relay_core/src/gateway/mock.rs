// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scripted gateway double.
//!
//! Records every order-creation call so tests can assert that the fast-fail
//! completeness gate short-circuits before the gateway is reached.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use async_trait::async_trait;

use super::{GatewayClient, GatewayOrder, GatewayOrderRequest};
use crate::{Error, Result};

#[derive(Default)]
pub struct MockGatewayClient {
    order_id: String,
    failure: Option<String>,
    calls: AtomicU64,
    requests: Mutex<Vec<GatewayOrderRequest>>,
}

impl MockGatewayClient {
    pub fn new() -> Self {
        Self {
            order_id: "order_mock".to_string(),
            ..Self::default()
        }
    }

    /// Answers every call with the given gateway order id.
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = order_id.into();
        self
    }

    /// Fails every call with the given gateway message.
    pub fn failing_with(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::new()
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<GatewayOrderRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GatewayClient for MockGatewayClient {
    async fn create_order(&self, order: &GatewayOrderRequest) -> Result<GatewayOrder> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(order.clone());

        if let Some(message) = &self.failure {
            return Err(Error::Gateway {
                message: message.clone(),
            });
        }

        Ok(GatewayOrder {
            id: self.order_id.clone(),
            amount: order.amount,
            currency: order.currency,
            receipt: order.receipt.clone(),
            status: "created".to_string(),
        })
    }
}
