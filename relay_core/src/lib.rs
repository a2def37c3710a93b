// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Payment order lifecycle and callback verification
//!
//! A checkout attempt produces a short-lived order request on the client, a
//! gateway order on the payment gateway, and, once the user pays inside the
//! gateway's hosted UI, a completion callback carrying an HMAC tag over the
//! identifiers the gateway issued. This crate owns that lifecycle:
//!
//! - [`order`] creates gateway orders after a fast-fail completeness gate and
//!   converts major-unit amounts to the gateway's integer minor units.
//! - [`verification`] recomputes the callback tag with the shared secret and
//!   accepts only a byte-exact match.
//! - [`checkout`] wraps one checkout attempt in a typestate machine:
//!   `Idle`, `ScriptLoading`, `OrderCreating`, `GatewayUiOpen`, `Verifying`,
//!   then `Succeeded`, `Failed`, or `Closed` on user dismissal.
//! - [`gateway`] is the outbound client seam, with a Razorpay REST
//!   implementation and a scripted double for tests.
//!
//! Nothing in this crate persists state: gateway orders live on the gateway,
//! verification reports belong to the caller.

use std::time::{SystemTime, UNIX_EPOCH};

pub mod checkout;
pub mod config;
mod error;
pub mod gateway;
pub mod guard;
pub mod order;
pub mod verification;

pub use error::{Error, Result};

pub(crate) fn current_epoch_millis() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| Error::InvalidSystemTime {
            source_error_message: err.to_string(),
        })?
        .as_millis() as u64)
}
