// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

use std::result::Result as StdResult;

use thiserror::Error as ThisError;

/// Failure taxonomy for the payment order relay.
///
/// `IncompleteData` and `InvalidSignature` are client-correctable and must
/// never be retried with unchanged inputs; `Gateway` and
/// `VerificationUnavailable` cover the two outbound seams and may be retried
/// by re-triggering the whole checkout attempt.
#[derive(ThisError, Debug, Clone)]
pub enum Error {
    #[error("missing required field: {field}")]
    IncompleteData { field: &'static str },
    #[error("gateway order creation failed: {message}")]
    Gateway { message: String },
    #[error("payment signature mismatch for order {order_id}")]
    InvalidSignature { order_id: String },
    #[error("gateway checkout script failed to load: {reason}")]
    ScriptLoad { reason: String },
    #[error("verification call failed before a result was produced: {reason}")]
    VerificationUnavailable { reason: String },
    #[error("an order is already pending for user {user_id}")]
    PendingOrderExists { user_id: String },
    #[error("missing gateway credential: {name}")]
    MissingCredential { name: &'static str },
    #[error("failed to get current system time: {source_error_message}")]
    InvalidSystemTime { source_error_message: String },
}

pub type Result<T> = StdResult<T, Error>;
