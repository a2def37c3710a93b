// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Prometheus metrics endpoint, served on its own port.

use axum::{routing::get, Router};
use log::error;
use prometheus::{Encoder, TextEncoder};
use tokio::net::TcpListener;

async fn metrics_handler() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(err) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("failed to encode metrics: {err}");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Serves `/metrics` until the process exits.
pub async fn run_server(port: u16) {
    let app = Router::new().route("/metrics", get(metrics_handler));

    let listener = match TcpListener::bind(&format!("0.0.0.0:{port}")).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("metrics server failed to bind port {port}: {err}");
            return;
        }
    };

    if let Err(err) = axum::serve(listener, app).await {
        error!("metrics server error: {err}");
    }
}
