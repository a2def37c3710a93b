// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Payment verification
//!
//! Decides whether a gateway completion callback is genuine. A callback
//! carries the gateway order id, the payment id and an HMAC-SHA256 tag over
//! the pair; the relay recomputes the tag with the shared secret and accepts
//! only a byte-exact match. There is no fallback verification path and no
//! partial credit: the only verified status is [`PaymentStatus::Completed`].
//!
//! Verification is pure, with no side effect beyond the computation itself,
//! and therefore idempotent. Whether a payment was already verified or
//! consumed is the gateway's and the caller's responsibility.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{config::GatewayConfig, Error, Result};

/// Status of a verified payment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display, strum::EnumString)]
pub enum PaymentStatus {
    #[strum(serialize = "completed")]
    Completed,
}

// We implement our own Serialize and Deserialize traits for `PaymentStatus`
// because the ones derived by `serde` serialize the enum member names as
// strings (eg. "Completed"), while we want to serialize them using the
// variant strings we set through `strum` (eg. "completed").

impl serde::ser::Serialize for PaymentStatus {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> serde::de::Deserialize<'de> for PaymentStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<PaymentStatus, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PaymentStatus::from_str(&s).map_err(serde::de::Error::custom)
    }
}

/// Outcome of a successful verification. Not persisted here; recording it is
/// the caller's job.
#[derive(Debug, Clone, serde::Serialize)]
pub struct VerificationReport {
    pub payment_id: String,
    pub order_id: String,
    pub status: PaymentStatus,
    pub verified_at: DateTime<Utc>,
}

/// Verifies gateway completion callbacks against the shared secret.
pub struct VerificationService {
    config: Arc<GatewayConfig>,
}

impl VerificationService {
    pub fn new(config: Arc<GatewayConfig>) -> Self {
        Self { config }
    }

    /// Verifies one completion callback.
    ///
    /// All three parameters are mandatory; an empty one short-circuits to
    /// [`Error::IncompleteData`] before any signature computation. A tag
    /// mismatch is [`Error::InvalidSignature`]; it is not transient and must
    /// not be retried automatically.
    pub fn verify_payment(
        &self,
        order_id: &str,
        payment_id: &str,
        signature: &str,
    ) -> Result<VerificationReport> {
        if order_id.is_empty() {
            return Err(Error::IncompleteData { field: "order_id" });
        }
        if payment_id.is_empty() {
            return Err(Error::IncompleteData { field: "payment_id" });
        }
        if signature.is_empty() {
            return Err(Error::IncompleteData { field: "signature" });
        }

        if !relay_signature::verify(order_id, payment_id, signature, self.config.key_secret()) {
            log::warn!("signature mismatch for order {order_id}");
            return Err(Error::InvalidSignature {
                order_id: order_id.to_string(),
            });
        }

        Ok(VerificationReport {
            payment_id: payment_id.to_string(),
            order_id: order_id.to_string(),
            status: PaymentStatus::Completed,
            verified_at: Utc::now(),
        })
    }
}
