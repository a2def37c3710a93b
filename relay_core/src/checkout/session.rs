// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! One checkout attempt wrapped in the typestate machine.
//!
//! Transitions consume the session and return the next state's type, so an
//! attempt can never skip a step or fail in a way its state doesn't allow.

use super::{
    state::{
        CheckoutState, Closed, Failed, GatewayUiOpen, Idle, OrderCreating, ScriptLoading,
        Succeeded, Verifying,
    },
    CheckoutReceipt, CompletionCallback, PaymentVerifier,
};
use crate::{
    order::{CreatedOrder, OrderRequest},
    Error,
};

pub type ResultCheckout<S> = std::result::Result<CheckoutWithState<S>, CheckoutWithState<Failed>>;

/// A checkout attempt in state `S`.
#[derive(Debug, Clone)]
pub struct CheckoutWithState<S>
where
    S: CheckoutState,
{
    request: OrderRequest,
    state: S,
}

impl CheckoutWithState<Idle> {
    /// Creates a new attempt in the `Idle` state.
    pub fn new(request: OrderRequest) -> CheckoutWithState<Idle> {
        CheckoutWithState {
            request,
            state: Idle,
        }
    }

    /// A checkout attempt was triggered; start fetching the gateway script.
    pub fn begin(self) -> CheckoutWithState<ScriptLoading> {
        self.advance(ScriptLoading)
    }
}

impl CheckoutWithState<ScriptLoading> {
    pub fn script_loaded(self) -> CheckoutWithState<OrderCreating> {
        self.advance(OrderCreating)
    }

    /// Script load failed; terminal, no retry at this layer.
    pub fn script_failed(self, error: Error) -> CheckoutWithState<Failed> {
        self.fail(error)
    }
}

impl CheckoutWithState<OrderCreating> {
    pub fn order_created(self, order: CreatedOrder) -> CheckoutWithState<GatewayUiOpen> {
        self.advance(GatewayUiOpen { order })
    }

    pub fn order_failed(self, error: Error) -> CheckoutWithState<Failed> {
        self.fail(error)
    }
}

impl CheckoutWithState<GatewayUiOpen> {
    pub fn order(&self) -> &CreatedOrder {
        &self.state.order
    }

    /// The gateway reported a completed payment.
    pub fn completed(self, callback: CompletionCallback) -> CheckoutWithState<Verifying> {
        let order = self.state.order.clone();
        self.advance(Verifying { order, callback })
    }

    /// The user dismissed the gateway UI before completing payment. No
    /// partial order state is left pending on our side.
    pub fn dismissed(self) -> CheckoutWithState<Closed> {
        self.advance(Closed)
    }
}

impl CheckoutWithState<Verifying> {
    /// Runs the verification call and transitions the attempt.
    ///
    /// Returns `Err` with a [`CheckoutWithState<Failed>`] carrying either
    /// [`Error::InvalidSignature`] (a rejection; retrying cannot help) or
    /// [`Error::VerificationUnavailable`] (the call itself failed; the caller
    /// may retry), returns `Ok` with a [`CheckoutWithState<Succeeded>`] on a
    /// verified payment.
    pub async fn verify(self, verifier: &dyn PaymentVerifier) -> ResultCheckout<Succeeded> {
        match verifier.verify(&self.state.callback).await {
            Ok(verification) => {
                let receipt = CheckoutReceipt {
                    amount: self.state.order.amount,
                    items: self.state.order.items.clone(),
                    verification,
                };
                Ok(self.advance(Succeeded { receipt }))
            }
            Err(error) => Err(self.fail(error)),
        }
    }
}

impl CheckoutWithState<Succeeded> {
    /// The verification result merged with the original items and amount.
    pub fn into_receipt(self) -> CheckoutReceipt {
        self.state.receipt
    }
}

impl CheckoutWithState<Failed> {
    pub fn error(self) -> Error {
        self.state.error
    }
}

impl CheckoutWithState<Closed> {
    /// Resets the attempt for a fresh trigger.
    pub fn reset(self) -> CheckoutWithState<Idle> {
        self.advance(Idle)
    }
}

impl<S> CheckoutWithState<S>
where
    S: CheckoutState,
{
    pub fn request(&self) -> &OrderRequest {
        &self.request
    }

    fn advance<T>(self, next_state: T) -> CheckoutWithState<T>
    where
        T: CheckoutState,
    {
        CheckoutWithState {
            request: self.request,
            state: next_state,
        }
    }

    fn fail(self, error: Error) -> CheckoutWithState<Failed> {
        self.advance(Failed { error })
    }
}
