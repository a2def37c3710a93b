// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Razorpay REST implementation of [`GatewayClient`].

use std::sync::Arc;

use async_trait::async_trait;
use log::{error, info};
use serde::Deserialize;

use super::{GatewayClient, GatewayOrder, GatewayOrderRequest};
use crate::{config::GatewayConfig, Error, Result};

const DEFAULT_BASE_URL: &str = "https://api.razorpay.com";

/// Client for the gateway's `/v1/orders` endpoint, authenticated with HTTP
/// basic auth over the key pair.
pub struct RazorpayClient {
    base_url: String,
    config: Arc<GatewayConfig>,
    http_client: reqwest::Client,
}

/// Error envelope the gateway returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: Option<GatewayErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    description: Option<String>,
}

impl RazorpayClient {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            config,
            http_client: reqwest::Client::new(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[async_trait]
impl GatewayClient for RazorpayClient {
    async fn create_order(&self, order: &GatewayOrderRequest) -> Result<GatewayOrder> {
        let url = format!("{}/v1/orders", self.base_url);

        let resp = self
            .http_client
            .post(&url)
            .basic_auth(self.config.key_id(), Some(self.config.key_secret()))
            .json(order)
            .send()
            .await
            .map_err(|err| Error::Gateway {
                message: format!("order request did not reach the gateway: {err}"),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            // Pass the gateway's own description through unaltered.
            let message = match resp.json::<GatewayErrorBody>().await {
                Ok(body) => body
                    .error
                    .and_then(|detail| detail.description)
                    .unwrap_or_else(|| status.to_string()),
                Err(_) => status.to_string(),
            };
            error!("gateway rejected order creation: {message}");
            return Err(Error::Gateway { message });
        }

        let created: GatewayOrder = resp.json().await.map_err(|err| Error::Gateway {
            message: format!("malformed gateway order response: {err}"),
        })?;

        info!(
            "gateway order {} created for receipt {}",
            created.id, created.receipt
        );
        Ok(created)
    }
}
