// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! Process-wide gateway configuration.
//!
//! Built once at startup from the environment and passed by `Arc` into the
//! services that need it; never re-read per request. The key secret stays
//! inside this type: it has no `Serialize` impl, is redacted from `Debug`
//! output, and is only readable from within this crate.

use std::fmt;

use crate::{Error, Result};

/// Immutable gateway credentials.
pub struct GatewayConfig {
    key_id: String,
    key_secret: String,
}

impl GatewayConfig {
    /// Fails closed: a missing or blank credential is rejected here, so the
    /// signature and order endpoints can never operate with an empty secret.
    pub fn new(key_id: impl Into<String>, key_secret: impl Into<String>) -> Result<Self> {
        let key_id = key_id.into();
        let key_secret = key_secret.into();
        if key_id.trim().is_empty() {
            return Err(Error::MissingCredential { name: "key_id" });
        }
        if key_secret.trim().is_empty() {
            return Err(Error::MissingCredential { name: "key_secret" });
        }
        Ok(Self { key_id, key_secret })
    }

    /// The publishable key id, the only gateway credential allowed to cross
    /// into client-visible data.
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub(crate) fn key_secret(&self) -> &str {
        &self.key_secret
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<redacted>")
            .finish()
    }
}
