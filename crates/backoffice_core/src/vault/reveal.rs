//! Time-boxed cache of revealed vault plaintext.
//!
//! # Invariants
//! - An entry is visible only while `0 <= now - revealed_at < ttl_ms`.
//! - Expired entries are dropped on access and by `purge_expired`.
//! - Re-reading a fresh entry never extends its lifetime.
//!
//! The timer keeps plaintext off screen; it does not protect process memory.

use crate::model::vault::VaultItemId;
use std::collections::HashMap;

/// Default reveal window.
pub const DEFAULT_REVEAL_TTL_MS: i64 = 60_000;

#[derive(Debug, Clone, PartialEq, Eq)]
struct RevealedSecret {
    plaintext: String,
    revealed_at: i64,
}

/// Per-item plaintext with reveal timestamps.
#[derive(Debug, Clone)]
pub struct RevealCache {
    ttl_ms: i64,
    entries: HashMap<VaultItemId, RevealedSecret>,
}

impl Default for RevealCache {
    fn default() -> Self {
        Self::new(DEFAULT_REVEAL_TTL_MS)
    }
}

impl RevealCache {
    /// Creates a cache; non-positive TTLs fall back to the default.
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl_ms: if ttl_ms > 0 {
                ttl_ms
            } else {
                DEFAULT_REVEAL_TTL_MS
            },
            entries: HashMap::new(),
        }
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Stores plaintext revealed at `now`, replacing any previous entry.
    pub fn insert(&mut self, id: VaultItemId, plaintext: String, now: i64) {
        self.entries.insert(
            id,
            RevealedSecret {
                plaintext,
                revealed_at: now,
            },
        );
    }

    /// Returns fresh plaintext, dropping the entry if it has expired.
    pub fn get(&mut self, id: VaultItemId, now: i64) -> Option<&str> {
        let expired = self
            .entries
            .get(&id)
            .is_some_and(|entry| !self.is_fresh(entry, now));
        if expired {
            self.entries.remove(&id);
            return None;
        }
        self.entries.get(&id).map(|entry| entry.plaintext.as_str())
    }

    /// Milliseconds until the entry expires, if it is still fresh.
    pub fn remaining_ms(&self, id: VaultItemId, now: i64) -> Option<i64> {
        self.entries
            .get(&id)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.revealed_at + self.ttl_ms - now)
    }

    pub fn is_revealed(&self, id: VaultItemId, now: i64) -> bool {
        self.remaining_ms(id, now).is_some()
    }

    /// Drops one entry. Returns whether a value was cached.
    pub fn remove(&mut self, id: VaultItemId) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&mut self, now: i64) -> usize {
        let ttl_ms = self.ttl_ms;
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| within_ttl(entry.revealed_at, now, ttl_ms));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, entry: &RevealedSecret, now: i64) -> bool {
        within_ttl(entry.revealed_at, now, self.ttl_ms)
    }
}

/// A clock that moved backwards past the reveal time counts as expired.
fn within_ttl(revealed_at: i64, now: i64, ttl_ms: i64) -> bool {
    (0..ttl_ms).contains(&now.saturating_sub(revealed_at))
}
