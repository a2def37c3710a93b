// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Checkout orchestration (non-UI)
//!
//! Drives one browser checkout attempt end to end:
//!
//! ```text
//! Idle -> ScriptLoading -> OrderCreating -> GatewayUiOpen -> Verifying
//!                                |               |               |
//!                                v               v               v
//!                             Failed          Closed      Succeeded | Failed
//! ```
//!
//! Each attempt is a cooperative state machine advanced by I/O completions:
//! script load, the order-creation round trip, the gateway UI callback, the
//! verification call. Within one attempt nothing runs in parallel, and only
//! the `GatewayUiOpen -> Closed` transition is a defined cancellation path.
//! Concurrent attempts are independent; deduplicating them is the
//! [`crate::guard`] module's opt-in concern, not the orchestrator's.
//!
//! The UI itself (rendering, script injection, the hosted checkout window)
//! lives outside this crate. The traits here are the seams where it plugs in.

pub mod state;

mod session;

use async_trait::async_trait;

use crate::{
    gateway::GatewayClient,
    order::{CreatedOrder, OrderItem, OrderRequest, OrderService},
    verification::{VerificationReport, VerificationService},
    Error, Result,
};

pub use session::{CheckoutWithState, ResultCheckout};

/// Payload of the gateway's completion callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCallback {
    pub order_id: String,
    pub payment_id: String,
    pub signature: String,
}

/// Verification result merged with the attempt's original items and amount,
/// handed to the caller on success.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub amount: f64,
    pub items: Vec<OrderItem>,
    pub verification: VerificationReport,
}

/// What the gateway's hosted UI reported back.
#[derive(Debug, Clone)]
pub enum GatewayUiEvent {
    Completed(CompletionCallback),
    Dismissed,
}

/// Fetches the gateway's client script. A load error is terminal for the
/// attempt; the caller must re-trigger checkout.
#[async_trait]
pub trait ScriptLoader: Send + Sync {
    async fn load(&self) -> Result<()>;
}

/// Opens the gateway's hosted checkout and waits, without a timeout, for the
/// user.
#[async_trait]
pub trait GatewayUi: Send + Sync {
    async fn open(&self, order: &CreatedOrder) -> GatewayUiEvent;
}

/// Seam for the verification call.
///
/// A rejection ([`Error::InvalidSignature`]) and a failed call
/// ([`Error::VerificationUnavailable`]) are distinct kinds, so callers can
/// tell "never retry" from "may retry".
#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, callback: &CompletionCallback) -> Result<VerificationReport>;
}

#[async_trait]
impl PaymentVerifier for VerificationService {
    async fn verify(&self, callback: &CompletionCallback) -> Result<VerificationReport> {
        self.verify_payment(
            &callback.order_id,
            &callback.payment_id,
            &callback.signature,
        )
    }
}

/// Terminal outcome of one checkout attempt.
#[derive(Debug)]
pub enum CheckoutOutcome {
    Succeeded(CheckoutReceipt),
    /// User dismissed the gateway UI; the attempt was reset to `Idle`.
    Dismissed,
    Failed(Error),
}

/// Runs one checkout attempt against the injected collaborators.
pub async fn run_checkout<G: GatewayClient>(
    request: OrderRequest,
    loader: &dyn ScriptLoader,
    ui: &dyn GatewayUi,
    orders: &OrderService<G>,
    verifier: &dyn PaymentVerifier,
    on_close: Option<&(dyn Fn() + Send + Sync)>,
) -> CheckoutOutcome {
    let session = CheckoutWithState::new(request).begin();

    let session = match loader.load().await {
        Ok(()) => session.script_loaded(),
        Err(error) => return CheckoutOutcome::Failed(session.script_failed(error).error()),
    };

    let session = match orders.create_order(session.request()).await {
        Ok(order) => session.order_created(order),
        Err(error) => return CheckoutOutcome::Failed(session.order_failed(error).error()),
    };

    let session = match ui.open(session.order()).await {
        GatewayUiEvent::Completed(callback) => session.completed(callback),
        GatewayUiEvent::Dismissed => {
            if let Some(close) = on_close {
                close();
            }
            let _idle = session.dismissed().reset();
            return CheckoutOutcome::Dismissed;
        }
    };

    match session.verify(verifier).await {
        Ok(done) => CheckoutOutcome::Succeeded(done.into_receipt()),
        Err(failed) => CheckoutOutcome::Failed(failed.error()),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    };

    use super::*;
    use crate::{
        config::GatewayConfig,
        gateway::MockGatewayClient,
        verification::PaymentStatus,
    };

    const SECRET: &str = "test_secret";

    struct ScriptOk;

    #[async_trait]
    impl ScriptLoader for ScriptOk {
        async fn load(&self) -> Result<()> {
            Ok(())
        }
    }

    struct ScriptFails;

    #[async_trait]
    impl ScriptLoader for ScriptFails {
        async fn load(&self) -> Result<()> {
            Err(Error::ScriptLoad {
                reason: "network error".to_string(),
            })
        }
    }

    /// Completes the payment with a tag computed over whatever order id the
    /// gateway issued.
    struct UiCompletes {
        payment_id: String,
        secret: String,
        opened: AtomicU64,
    }

    impl UiCompletes {
        fn new(secret: &str) -> Self {
            Self {
                payment_id: "pay_xyz".to_string(),
                secret: secret.to_string(),
                opened: AtomicU64::new(0),
            }
        }
    }

    #[async_trait]
    impl GatewayUi for UiCompletes {
        async fn open(&self, order: &CreatedOrder) -> GatewayUiEvent {
            self.opened.fetch_add(1, Ordering::SeqCst);
            GatewayUiEvent::Completed(CompletionCallback {
                order_id: order.order_id.clone(),
                payment_id: self.payment_id.clone(),
                signature: relay_signature::sign(&order.order_id, &self.payment_id, &self.secret),
            })
        }
    }

    /// Completes with a deliberately wrong tag.
    struct UiCompletesTampered;

    #[async_trait]
    impl GatewayUi for UiCompletesTampered {
        async fn open(&self, order: &CreatedOrder) -> GatewayUiEvent {
            GatewayUiEvent::Completed(CompletionCallback {
                order_id: order.order_id.clone(),
                payment_id: "pay_xyz".to_string(),
                signature: relay_signature::sign(&order.order_id, "pay_other", SECRET),
            })
        }
    }

    struct UiDismisses;

    #[async_trait]
    impl GatewayUi for UiDismisses {
        async fn open(&self, _order: &CreatedOrder) -> GatewayUiEvent {
            GatewayUiEvent::Dismissed
        }
    }

    /// Verification seam whose call itself fails, as a network fault would.
    struct VerifierUnreachable;

    #[async_trait]
    impl PaymentVerifier for VerifierUnreachable {
        async fn verify(&self, _callback: &CompletionCallback) -> Result<VerificationReport> {
            Err(Error::VerificationUnavailable {
                reason: "connection refused".to_string(),
            })
        }
    }

    fn config() -> Arc<GatewayConfig> {
        Arc::new(GatewayConfig::new("rzp_test_key", SECRET).unwrap())
    }

    fn cart() -> OrderRequest {
        OrderRequest {
            items: vec![OrderItem {
                name: "Annual subscription".to_string(),
                quantity: 1,
                price: 250.0,
            }],
            total_amount: Some(250.0),
            user_id: "u1".to_string(),
        }
    }

    #[tokio::test]
    async fn happy_path_reaches_succeeded_with_merged_receipt() {
        let gateway = MockGatewayClient::new().with_order_id("order_abc");
        let orders = OrderService::new(&gateway, config());
        let verifier = VerificationService::new(config());
        let ui = UiCompletes::new(SECRET);

        let outcome = run_checkout(cart(), &ScriptOk, &ui, &orders, &verifier, None).await;

        match outcome {
            CheckoutOutcome::Succeeded(receipt) => {
                assert_eq!(receipt.amount, 250.0);
                assert_eq!(receipt.items.len(), 1);
                assert_eq!(receipt.verification.order_id, "order_abc");
                assert_eq!(receipt.verification.payment_id, "pay_xyz");
                assert_eq!(receipt.verification.status, PaymentStatus::Completed);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn script_load_failure_is_terminal() {
        let gateway = MockGatewayClient::new();
        let orders = OrderService::new(&gateway, config());
        let verifier = VerificationService::new(config());
        let ui = UiCompletes::new(SECRET);

        let outcome = run_checkout(cart(), &ScriptFails, &ui, &orders, &verifier, None).await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(Error::ScriptLoad { .. })
        ));
        // The attempt never got as far as the gateway or its UI.
        assert_eq!(gateway.call_count(), 0);
        assert_eq!(ui.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn incomplete_request_fails_before_the_ui_opens() {
        let gateway = MockGatewayClient::new();
        let orders = OrderService::new(&gateway, config());
        let verifier = VerificationService::new(config());
        let ui = UiCompletes::new(SECRET);

        let request = OrderRequest {
            items: vec![],
            total_amount: None,
            user_id: "u1".to_string(),
        };
        let outcome = run_checkout(request, &ScriptOk, &ui, &orders, &verifier, None).await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(Error::IncompleteData { field: "items" })
        ));
        assert_eq!(gateway.call_count(), 0);
        assert_eq!(ui.opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn gateway_failure_surfaces_the_gateway_message() {
        let gateway = MockGatewayClient::failing_with("quota exceeded");
        let orders = OrderService::new(&gateway, config());
        let verifier = VerificationService::new(config());
        let ui = UiCompletes::new(SECRET);

        let outcome = run_checkout(cart(), &ScriptOk, &ui, &orders, &verifier, None).await;

        match outcome {
            CheckoutOutcome::Failed(Error::Gateway { message }) => {
                assert_eq!(message, "quota exceeded")
            }
            other => panic!("expected gateway failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn dismissal_invokes_the_close_callback_and_resets() {
        let gateway = MockGatewayClient::new();
        let orders = OrderService::new(&gateway, config());
        let verifier = VerificationService::new(config());

        let closed = AtomicBool::new(false);
        let on_close = || closed.store(true, Ordering::SeqCst);

        let outcome = run_checkout(
            cart(),
            &ScriptOk,
            &UiDismisses,
            &orders,
            &verifier,
            Some(&on_close),
        )
        .await;

        assert!(matches!(outcome, CheckoutOutcome::Dismissed));
        assert!(closed.load(Ordering::SeqCst));
        // One gateway order was created and abandoned; it expires on the
        // gateway's side, not ours.
        assert_eq!(gateway.call_count(), 1);
    }

    #[tokio::test]
    async fn tampered_callback_fails_as_a_rejection() {
        let gateway = MockGatewayClient::new().with_order_id("order_abc");
        let orders = OrderService::new(&gateway, config());
        let verifier = VerificationService::new(config());

        let outcome = run_checkout(
            cart(),
            &ScriptOk,
            &UiCompletesTampered,
            &orders,
            &verifier,
            None,
        )
        .await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(Error::InvalidSignature { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_verifier_fails_as_unavailable_not_rejected() {
        let gateway = MockGatewayClient::new();
        let orders = OrderService::new(&gateway, config());
        let ui = UiCompletes::new(SECRET);

        let outcome = run_checkout(
            cart(),
            &ScriptOk,
            &ui,
            &orders,
            &VerifierUnreachable,
            None,
        )
        .await;

        assert!(matches!(
            outcome,
            CheckoutOutcome::Failed(Error::VerificationUnavailable { .. })
        ));
    }
}
