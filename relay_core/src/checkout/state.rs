// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Checkout states
//!
//! These are the implementation of the typestate pattern for tracking the
//! state of one checkout attempt. The `CheckoutState` trait represents the
//! different states the attempt can be in.

use crate::{
    checkout::{CheckoutReceipt, CompletionCallback},
    order::CreatedOrder,
    Error,
};

/// Checkout attempt constructed, nothing triggered yet.
#[derive(Debug, Clone)]
pub struct Idle;

/// The gateway's client script is being fetched.
#[derive(Debug, Clone)]
pub struct ScriptLoading;

/// The gateway order is being created.
#[derive(Debug, Clone)]
pub struct OrderCreating;

/// The gateway's hosted checkout is open; the user interacts outside this
/// system's control, for an unbounded time.
#[derive(Debug, Clone)]
pub struct GatewayUiOpen {
    pub(crate) order: CreatedOrder,
}

/// The completion callback is being verified.
#[derive(Debug, Clone)]
pub struct Verifying {
    pub(crate) order: CreatedOrder,
    pub(crate) callback: CompletionCallback,
}

/// The payment verified; terminal.
#[derive(Debug, Clone)]
pub struct Succeeded {
    pub(crate) receipt: CheckoutReceipt,
}

/// The attempt failed a step; terminal. The caller must re-trigger checkout
/// to try again.
#[derive(Debug, Clone)]
pub struct Failed {
    pub error: Error,
}

/// The user dismissed the gateway UI before paying. The gateway still holds
/// an unconsumed order, which expires per gateway policy.
#[derive(Debug, Clone)]
pub struct Closed;

/// Trait for the different states a checkout attempt can be in.
pub trait CheckoutState {}
impl CheckoutState for Idle {}
impl CheckoutState for ScriptLoading {}
impl CheckoutState for OrderCreating {}
impl CheckoutState for GatewayUiOpen {}
impl CheckoutState for Verifying {}
impl CheckoutState for Succeeded {}
impl CheckoutState for Failed {}
impl CheckoutState for Closed {}
