//! Supersession of in-flight requests.
//!
//! A view that re-requests data for the same key (e.g. the user navigating
//! between two anime quickly) only wants the latest result. Each call to
//! [`InvocationTracker::begin`] cancels the previous invocation for the key,
//! and a finished invocation hands its result to [`InvocationTracker::finish`],
//! which drops it if a newer invocation has begun. Finishing or cancelling
//! releases the key's slot.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use log::debug;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct Slot {
    generation: Arc<AtomicU64>,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct InvocationTracker {
    slots: Mutex<HashMap<String, Slot>>,
}

impl InvocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new invocation for `key`, superseding any earlier one.
    pub fn begin(&self, key: &str) -> Invocation {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let token = CancellationToken::new();

        let generation = match slots.get_mut(key) {
            Some(slot) => {
                slot.token.cancel();
                slot.token = token.clone();
                slot.generation.fetch_add(1, Ordering::SeqCst);
                slot.generation.clone()
            }
            None => {
                let generation = Arc::new(AtomicU64::new(0));
                slots.insert(
                    key.to_string(),
                    Slot {
                        generation: generation.clone(),
                        token: token.clone(),
                    },
                );
                generation
            }
        };

        let number = generation.load(Ordering::SeqCst);
        debug!("Invocation #{number} for {key}");
        Invocation {
            key: key.to_string(),
            number,
            latest: generation,
            token,
        }
    }

    /// Completes `invocation` and releases its slot. Returns `value` only if
    /// no newer invocation for the key has begun.
    pub fn finish<T>(&self, invocation: Invocation, value: T) -> Option<T> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if !invocation.is_current() {
            debug!("Dropping stale invocation #{} for {}", invocation.number, invocation.key);
            return None;
        }
        if let Some(slot) = slots.remove(&invocation.key) {
            slot.generation.fetch_add(1, Ordering::SeqCst);
        }
        Some(value)
    }

    /// Cancels the in-flight invocation for `key`, if any, and releases its
    /// slot.
    pub fn cancel(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = slots.remove(key) {
            slot.token.cancel();
            slot.generation.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Number of keys with an invocation in flight.
    pub fn in_flight(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Ticket for one invocation started by [`InvocationTracker::begin`].
#[derive(Debug, Clone)]
pub struct Invocation {
    key: String,
    number: u64,
    latest: Arc<AtomicU64>,
    token: CancellationToken,
}

impl Invocation {
    /// Token to pass to service calls made for this invocation.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// `false` once a newer invocation for the same key has begun.
    pub fn is_current(&self) -> bool {
        self.latest.load(Ordering::SeqCst) == self.number
    }

    /// Returns `value` only if this invocation is still the latest.
    pub fn accept<T>(&self, value: T) -> Option<T> {
        self.is_current().then_some(value)
    }
}
