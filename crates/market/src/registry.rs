//! Stream key → bounded delivery channel bookkeeping.
//!
//! The registry holds at most one live sender per stream key. Registering a
//! key again replaces the previous sender, which closes the previous receiver.

use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Raw `data` payload of a combined-stream frame.
pub type Payload = Vec<u8>;

/// Result of routing one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Delivered,
    /// Subscriber buffer full; the payload was discarded.
    Dropped,
    /// Subscriber receiver is gone; the entry was pruned.
    Closed,
    NoSubscriber,
}

#[derive(Debug, Default)]
pub struct StreamRegistry {
    subscribers: HashMap<String, mpsc::Sender<Payload>>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a bounded channel for `key` and returns its receiving end.
    ///
    /// A zero `buffer` is bumped to 1 since tokio channels require capacity.
    pub fn insert(&mut self, key: impl Into<String>, buffer: usize) -> mpsc::Receiver<Payload> {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        self.subscribers.insert(key.into(), tx);
        rx
    }

    /// Attempts a non-blocking delivery of `payload` to the subscriber of `key`.
    pub fn dispatch(&mut self, key: &str, payload: Payload) -> DispatchOutcome {
        let Some(tx) = self.subscribers.get(key) else {
            return DispatchOutcome::NoSubscriber;
        };

        match tx.try_send(payload) {
            Ok(()) => DispatchOutcome::Delivered,
            Err(TrySendError::Full(_)) => DispatchOutcome::Dropped,
            Err(TrySendError::Closed(_)) => {
                self.subscribers.remove(key);
                DispatchOutcome::Closed
            }
        }
    }

    /// Removes the subscriber for `key`, closing its channel.
    pub fn remove(&mut self, key: &str) -> bool {
        self.subscribers.remove(key).is_some()
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.subscribers.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.subscribers.keys().cloned().collect()
    }

    /// Removes every subscriber, closing each channel exactly once. Returns how many were closed.
    pub fn drain(&mut self) -> usize {
        let count = self.subscribers.len();
        self.subscribers.clear();
        count
    }
}
