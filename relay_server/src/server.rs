// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use hyper::StatusCode;
use lazy_static::lazy_static;
use log::{error, info, warn};
use prometheus::{register_int_counter, IntCounter};
use relay_core::{
    config::GatewayConfig,
    gateway::GatewayClient,
    guard::PendingOrderGuard,
    order::{CreatedOrder, Currency, OrderItem, OrderRequest, OrderService},
    verification::{PaymentStatus, VerificationReport, VerificationService},
    Error as CoreError,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, signal, task::JoinHandle};

use crate::mailer::{Mailer, WelcomeEmail};

// Register the metrics into the global metrics registry.
lazy_static! {
    static ref ORDER_CREATION_SUCCESS_COUNTER: IntCounter = register_int_counter!(
        "order_creation_success_count",
        "Number of gateway orders successfully created."
    )
    .unwrap();
    static ref ORDER_CREATION_FAILURE_COUNTER: IntCounter = register_int_counter!(
        "order_creation_failure_count",
        "Number of failed order creation requests (for any reason)."
    )
    .unwrap();
    static ref VERIFICATION_SUCCESS_COUNTER: IntCounter = register_int_counter!(
        "verification_success_count",
        "Number of payment callbacks verified."
    )
    .unwrap();
    static ref VERIFICATION_FAILURE_COUNTER: IntCounter = register_int_counter!(
        "verification_failure_count",
        "Number of failed payment verification requests (for any reason)."
    )
    .unwrap();
    static ref SIGNATURE_REJECTION_COUNTER: IntCounter = register_int_counter!(
        "signature_rejection_count",
        "Number of verification requests rejected for a signature mismatch."
    )
    .unwrap();
    static ref WELCOME_EMAIL_SUCCESS_COUNTER: IntCounter = register_int_counter!(
        "welcome_email_success_count",
        "Number of welcome emails accepted by the mail API."
    )
    .unwrap();
    static ref WELCOME_EMAIL_FAILURE_COUNTER: IntCounter = register_int_counter!(
        "welcome_email_failure_count",
        "Number of welcome emails the mail API did not accept."
    )
    .unwrap();
}

#[derive(Clone)]
struct AppState {
    orders: Arc<OrderService<Arc<dyn GatewayClient>>>,
    verifier: Arc<VerificationService>,
    mailer: Option<Arc<dyn Mailer>>,
}

#[derive(Debug, Serialize)]
struct CreateOrderResponse {
    success: bool,
    order_id: String,
    razorpay_order_id: String,
    amount: f64,
    currency: Currency,
    key_id: String,
    items: Vec<OrderItem>,
    user_id: String,
}

impl From<CreatedOrder> for CreateOrderResponse {
    fn from(order: CreatedOrder) -> Self {
        Self {
            success: true,
            razorpay_order_id: order.order_id.clone(),
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            key_id: order.key_id,
            items: order.items,
            user_id: order.user_id,
        }
    }
}

/// Callback fields exactly as the gateway's checkout script posts them.
/// Absent fields deserialize to empty strings so the services' completeness
/// gates, not the JSON layer, produce the rejection.
#[derive(Debug, Deserialize)]
struct VerifyPaymentPayload {
    #[serde(default)]
    razorpay_order_id: String,
    #[serde(default)]
    razorpay_payment_id: String,
    #[serde(default)]
    razorpay_signature: String,
}

#[derive(Debug, Serialize)]
struct VerifyPaymentResponse {
    success: bool,
    payment_id: String,
    order_id: String,
    status: PaymentStatus,
    verified_at: DateTime<Utc>,
}

impl From<VerificationReport> for VerifyPaymentResponse {
    fn from(report: VerificationReport) -> Self {
        Self {
            success: true,
            payment_id: report.payment_id,
            order_id: report.order_id,
            status: report.status,
            verified_at: report.verified_at,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    message: &'static str,
}

#[derive(Debug, Serialize)]
struct EmailResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Structured failure sent to the client. Carries no secret and no internal
/// detail beyond what the gateway itself reported.
struct ApiError {
    status: StatusCode,
    message: String,
    detail: Option<String>,
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Gateway { message } => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "failed to create gateway order".to_string(),
                detail: Some(message),
            },
            CoreError::IncompleteData { .. } | CoreError::InvalidSignature { .. } => ApiError {
                status: StatusCode::BAD_REQUEST,
                message: err.to_string(),
                detail: None,
            },
            CoreError::PendingOrderExists { .. } => ApiError {
                status: StatusCode::CONFLICT,
                message: err.to_string(),
                detail: None,
            },
            other => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: other.to_string(),
                detail: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                success: false,
                message: self.message,
                error: self.detail,
            }),
        )
            .into_response()
    }
}

async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<OrderRequest>,
) -> Response {
    match state.orders.create_order(&request).await {
        Ok(order) => {
            ORDER_CREATION_SUCCESS_COUNTER.inc();
            info!(
                "created gateway order {} for user {}",
                order.order_id, order.user_id
            );
            (StatusCode::CREATED, Json(CreateOrderResponse::from(order))).into_response()
        }
        Err(err) => {
            ORDER_CREATION_FAILURE_COUNTER.inc();
            error!("order creation rejected: {err}");
            ApiError::from(err).into_response()
        }
    }
}

async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentPayload>,
) -> Response {
    match state.verifier.verify_payment(
        &payload.razorpay_order_id,
        &payload.razorpay_payment_id,
        &payload.razorpay_signature,
    ) {
        Ok(report) => {
            VERIFICATION_SUCCESS_COUNTER.inc();
            info!(
                "payment {} verified for order {}",
                report.payment_id, report.order_id
            );
            (StatusCode::OK, Json(VerifyPaymentResponse::from(report))).into_response()
        }
        Err(err) => {
            VERIFICATION_FAILURE_COUNTER.inc();
            if matches!(err, CoreError::InvalidSignature { .. }) {
                SIGNATURE_REJECTION_COUNTER.inc();
            }
            warn!("payment verification rejected: {err}");
            ApiError::from(err).into_response()
        }
    }
}

async fn send_email(State(state): State<AppState>, Json(email): Json<WelcomeEmail>) -> Response {
    let Some(mailer) = &state.mailer else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(EmailResponse {
                success: false,
                error: Some("mailer is not configured".to_string()),
            }),
        )
            .into_response();
    };

    if email.to.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(EmailResponse {
                success: false,
                error: Some("missing required field: to".to_string()),
            }),
        )
            .into_response();
    }

    match mailer.send_welcome(&email).await {
        Ok(()) => {
            WELCOME_EMAIL_SUCCESS_COUNTER.inc();
            (
                StatusCode::OK,
                Json(EmailResponse {
                    success: true,
                    error: None,
                }),
            )
                .into_response()
        }
        Err(err) => {
            WELCOME_EMAIL_FAILURE_COUNTER.inc();
            error!("welcome email failed: {err}");
            (
                StatusCode::BAD_GATEWAY,
                Json(EmailResponse {
                    success: false,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK",
        message: "payment order relay is running",
    })
}

pub async fn run_server(
    port: u16,
    gateway: Arc<dyn GatewayClient>,
    config: Arc<GatewayConfig>,
    pending_order_ttl: Option<Duration>,
    mailer: Option<Arc<dyn Mailer>>,
    max_concurrent_connections: u32,
) -> Result<(JoinHandle<()>, std::net::SocketAddr)> {
    let mut orders = OrderService::new(gateway, config.clone());
    if let Some(ttl) = pending_order_ttl {
        orders = orders.with_pending_order_guard(PendingOrderGuard::new(ttl));
    }

    let state = AppState {
        orders: Arc::new(orders),
        verifier: Arc::new(VerificationService::new(config)),
        mailer,
    };

    // Legacy-style paths kept for drop-in compatibility with the deployment
    // this service replaces.
    let app = Router::new()
        .route("/api/create_order.php", post(create_order))
        .route("/api/verify_payment.php", post(verify_payment))
        .route("/send-email", post(send_email))
        .route("/health", get(health))
        .layer(tower::limit::ConcurrencyLimitLayer::new(
            max_concurrent_connections as usize,
        ))
        .with_state(state);

    let listener = TcpListener::bind(&format!("0.0.0.0:{port}")).await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_handler())
            .await
        {
            error!("Payment relay error: {e}");
        }
    });

    Ok((handle, addr))
}

/// Graceful shutdown handler
async fn shutdown_handler() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Signal received, starting graceful shutdown");
}
