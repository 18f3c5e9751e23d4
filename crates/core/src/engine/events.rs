use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// Events a subscriber may fall behind by before new ones are dropped for it.
pub const SUBSCRIBER_CAPACITY: usize = 1024;

/// Fan-out of events to any number of channel subscribers.
///
/// Each subscriber gets a bounded queue. A full queue skips the event for
/// that subscriber only; disconnected subscribers are pruned on the next
/// emission.
#[derive(Debug)]
pub struct EventHub<E> {
    capacity: usize,
    subscribers: Mutex<Vec<Sender<E>>>,
}

impl<E: Clone> EventHub<E> {
    pub fn new() -> Self {
        Self::with_capacity(SUBSCRIBER_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> Receiver<E> {
        let (tx, rx) = crossbeam_channel::bounded(self.capacity);
        self.lock().push(tx);
        rx
    }

    pub fn emit(&self, event: E) {
        self.lock().retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::debug!(capacity = self.capacity, "subscriber lagging, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<E>>> {
        // A panicking subscriber cannot leave the list half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<E: Clone> Default for EventHub<E> {
    fn default() -> Self {
        Self::new()
    }
}
