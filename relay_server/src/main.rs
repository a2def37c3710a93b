// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

#![doc = include_str!("../README.md")]

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use clap::Parser;
use log::info;
use relay_core::{
    config::GatewayConfig,
    gateway::{GatewayClient, RazorpayClient},
};
use relay_server::{
    mailer::{HttpMailer, Mailer},
    metrics, server,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on for API requests.
    /// Defaults to 8080.
    #[arg(long, default_value_t = 8080, env = "RELAY_PORT")]
    port: u16,

    /// Gateway key id (publishable). Echoed to the browser so it can open the
    /// gateway's hosted checkout.
    #[arg(long, env = "RAZORPAY_KEY_ID")]
    key_id: String,

    /// Gateway key secret used to verify payment callbacks. Never leaves the
    /// process.
    #[arg(long, env = "RAZORPAY_KEY_SECRET")]
    key_secret: String,

    /// Base URL of the payment gateway's REST API.
    #[arg(
        long,
        default_value = "https://api.razorpay.com",
        env = "RELAY_GATEWAY_URL"
    )]
    gateway_url: String,

    /// Maximum number of concurrent connections.
    /// Defaults to 32.
    #[arg(long, default_value_t = 32, env = "RELAY_MAX_CONNECTIONS")]
    max_connections: u32,

    /// Metrics server port.
    /// Defaults to 5000.
    #[arg(long, default_value_t = 5000, env = "RELAY_METRICS_PORT")]
    metrics_port: u16,

    /// Enables the at-most-one-pending-order-per-user guard with the given
    /// TTL in seconds. The guard stays off when unset.
    #[arg(long, env = "RELAY_PENDING_ORDER_TTL_SECS")]
    pending_order_ttl_secs: Option<u64>,

    /// HTTP mail API endpoint for the welcome email relay. The /send-email
    /// route answers 503 until endpoint, key and sender are all set.
    #[arg(long, env = "RELAY_MAILER_ENDPOINT")]
    mailer_endpoint: Option<String>,

    /// HTTP mail API key.
    #[arg(long, env = "RELAY_MAILER_API_KEY")]
    mailer_api_key: Option<String>,

    /// Sender address for the welcome email relay.
    #[arg(long, env = "RELAY_MAILER_FROM")]
    mailer_from: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize the logger.
    // Set the log level by setting the RUST_LOG environment variable.
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    // Fail closed: a blank key pair must stop the process here, before any
    // signature or order endpoint can operate.
    let config = Arc::new(GatewayConfig::new(args.key_id, args.key_secret)?);
    info!("Gateway key id: {}", config.key_id());

    // Start the metrics server.
    // We just let it gracelessly get killed at the end of main()
    tokio::spawn(metrics::run_server(args.metrics_port));

    let gateway: Arc<dyn GatewayClient> =
        Arc::new(RazorpayClient::new(config.clone()).with_base_url(args.gateway_url));

    let mailer: Option<Arc<dyn Mailer>> =
        match (args.mailer_endpoint, args.mailer_api_key, args.mailer_from) {
            (Some(endpoint), Some(api_key), Some(from)) => {
                Some(Arc::new(HttpMailer::new(endpoint, api_key, from)))
            }
            _ => {
                info!("Mailer not configured; /send-email is disabled.");
                None
            }
        };

    // Start the API server.
    // This await is non-blocking
    let (handle, _) = server::run_server(
        args.port,
        gateway,
        config,
        args.pending_order_ttl_secs.map(Duration::from_secs),
        mailer,
        args.max_connections,
    )
    .await?;
    info!("Server started. Listening on port {}.", args.port);

    let _ = handle.await;

    // If we're here, we've received a signal to exit.
    info!("Shutting down...");
    Ok(())
}
