// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! # Payment callback signature
//!
//! This crate contains the keyed-hash primitive used to authenticate payment
//! gateway completion callbacks. When a checkout completes, the gateway signs
//! the order id and payment id it issued for that checkout with a secret
//! shared with the merchant. The relay recomputes the same HMAC-SHA256 tag
//! and accepts the callback only on a byte-exact match.
//!
//! # Example
//! ```rust
//! use relay_signature::{sign, verify};
//!
//! let tag = sign("order_abc", "pay_xyz", "secret");
//!
//! assert!(verify("order_abc", "pay_xyz", &tag, "secret"));
//! assert!(!verify("order_abc", "pay_tampered", &tag, "secret"));
//! ```

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Separator between the order id and payment id in the signed payload.
const PAYLOAD_SEPARATOR: char = '|';

/// Builds the exact byte string the gateway signs for a completed checkout:
/// `"{order_id}|{payment_id}"`.
pub fn signed_payload(order_id: &str, payment_id: &str) -> String {
    format!("{order_id}{PAYLOAD_SEPARATOR}{payment_id}")
}

/// Computes the HMAC-SHA256 tag over [`signed_payload`] with `secret`,
/// rendered as lowercase hexadecimal.
pub fn sign(order_id: &str, payment_id: &str, secret: &str) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(signed_payload(order_id, payment_id).as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Returns true iff `signature` is byte-for-byte the lowercase hex tag for
/// `(order_id, payment_id)` under `secret`.
///
/// The comparison covers the full hex rendition in constant time and is
/// case-sensitive: an uppercase rendition of the correct digest is rejected.
/// Never panics for well-formed string inputs.
pub fn verify(order_id: &str, payment_id: &str, signature: &str, secret: &str) -> bool {
    let expected = sign(order_id, payment_id, secret);
    expected.as_bytes().ct_eq(signature.as_bytes()).into()
}
