// Copyright 2023-, Semiotic AI, Inc.
// SPDX-License-Identifier: Apache-2.0

//! At-most-one-pending-order-per-user constraint.
//!
//! Concurrent or rapid repeated checkout submissions from the same user each
//! produce an independent gateway order; nothing downstream deduplicates
//! them. This guard closes that gap in-process: a user id holds at most one
//! live reservation, released on gateway failure and expired by TTL
//! otherwise. Opt-in: the relay runs without it unless a TTL is configured.

use std::{
    collections::{hash_map::Entry, HashMap},
    sync::RwLock,
    time::{Duration, Instant},
};

use crate::{Error, Result};

#[derive(Debug)]
pub struct PendingOrderGuard {
    ttl: Duration,
    pending: RwLock<HashMap<String, Instant>>,
}

impl PendingOrderGuard {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            pending: RwLock::new(HashMap::new()),
        }
    }

    /// Reserves the user's slot for one checkout attempt.
    ///
    /// Returns [`Error::PendingOrderExists`] while a live reservation is
    /// held. Anonymous requests (empty user id) are not deduplicated.
    pub fn try_reserve(&self, user_id: &str) -> Result<()> {
        if user_id.is_empty() {
            return Ok(());
        }

        let mut pending = self.pending.write().unwrap();
        let now = Instant::now();
        pending.retain(|_, reserved_at| now.duration_since(*reserved_at) < self.ttl);

        match pending.entry(user_id.to_string()) {
            Entry::Occupied(_) => Err(Error::PendingOrderExists {
                user_id: user_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(now);
                Ok(())
            }
        }
    }

    /// Frees the user's slot. Called when the gateway call fails, so a failed
    /// attempt never blocks the next one.
    pub fn release(&self, user_id: &str) {
        self.pending.write().unwrap().remove(user_id);
    }
}
