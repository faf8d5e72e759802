//! Token Verification
//!
//! [`TokenVerifier`] is the single source of truth for token validity. It
//! owns an in-memory index keyed by token value and a durable per-resource
//! slot (see [`KeyValueStore`]) that remembers which token a session holds.
//!
//! ```text
//! Minted ──store_token──▶ Active ──verify_token──▶ Verified   (no change)
//!                           │                 ├──▶ Mismatched (rejected, kept)
//!                           │                 └──▶ Expired    (evicted)
//!                           └──eviction timer────▶ Expired    (evicted)
//! ```

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::clock::Clock;
use crate::error::{PaymentError, Result};
use crate::model::{PaymentToken, PaymentVerification};
use crate::scheduler::Scheduler;
use crate::storage::KeyValueStore;

const SLOT_PREFIX: &str = "payment_token_";

/// Slot key for a resource
pub fn slot_key(resource_id: &str) -> String {
    format!("{SLOT_PREFIX}{resource_id}")
}

/// Access token index plus durable per-resource slots
pub struct TokenVerifier {
    index: Arc<Mutex<HashMap<String, PaymentToken>>>,
    slots: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    scheduler: Scheduler,
}

impl TokenVerifier {
    pub fn new(clock: Arc<dyn Clock>, slots: Arc<dyn KeyValueStore>) -> Self {
        Self {
            index: Arc::new(Mutex::new(HashMap::new())),
            slots,
            clock,
            scheduler: Scheduler::new(),
        }
    }

    /// Index a token and arm its eviction timer.
    ///
    /// Re-storing the same token value replaces the entry and re-arms the
    /// timer. An already expired token is dropped instead of stored.
    pub fn store_token(&self, token: PaymentToken) {
        let key = token.token.clone();
        let timer = eviction_key(&key);
        let now = self.clock.now();

        let Some(delay) = remaining(token.expires_at, now) else {
            self.scheduler.cancel(&timer);
            self.index.lock().remove(&key);
            tracing::debug!(resource_id = %token.resource_id, "Refusing to store expired token");
            return;
        };

        tracing::debug!(
            resource_id = %token.resource_id,
            expires_at = %token.expires_at,
            "Stored access token"
        );
        self.index.lock().insert(key.clone(), token);

        let index = Arc::clone(&self.index);
        self.scheduler.schedule(timer, delay, async move {
            if index.lock().remove(&key).is_some() {
                tracing::debug!("Evicted expired access token");
            }
        });
    }

    /// Check a token against the resource being accessed
    pub fn verify_token(&self, token: &str, resource_id: &str) -> PaymentVerification {
        match self.check(token, resource_id) {
            Ok(stored) => PaymentVerification::valid(stored),
            Err(err) => {
                tracing::debug!(resource_id = %resource_id, error = %err, "Token rejected");
                PaymentVerification::invalid(&err)
            }
        }
    }

    fn check(&self, token: &str, resource_id: &str) -> Result<PaymentToken> {
        let mut index = self.index.lock();

        let stored = index.get(token).ok_or(PaymentError::TokenNotFound)?;

        if stored.resource_id != resource_id {
            return Err(PaymentError::ResourceMismatch);
        }

        if stored.is_expired_at(self.clock.now()) {
            index.remove(token);
            drop(index);
            self.scheduler.cancel(&eviction_key(token));
            return Err(PaymentError::TokenExpired);
        }

        Ok(stored.clone())
    }

    /// Token remembered for a resource, if any
    pub fn get_stored_token(&self, resource_id: &str) -> Result<Option<String>> {
        self.slots.get(&slot_key(resource_id))
    }

    /// Remember a token for a resource, replacing any earlier one
    pub fn save_token_to_storage(&self, resource_id: &str, token: &str) -> Result<()> {
        self.slots.set(&slot_key(resource_id), token)
    }

    /// Forget the token remembered for a resource
    pub fn clear_stored_token(&self, resource_id: &str) -> Result<()> {
        self.slots.remove(&slot_key(resource_id))
    }

    /// Number of indexed tokens
    pub fn len(&self) -> usize {
        self.index.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.lock().is_empty()
    }

    /// Cancel all pending eviction timers
    pub fn shutdown(&self) {
        self.scheduler.shutdown();
    }
}

fn eviction_key(token: &str) -> String {
    format!("evict:{token}")
}

/// Time left before `expires_at`, or `None` once it has passed
fn remaining(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Option<Duration> {
    if now >= expires_at {
        return None;
    }
    (expires_at - now).to_std().ok()
}
