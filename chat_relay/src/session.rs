use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::*;

use crate::ThreadId;

/// Session used when the caller does not name one.
pub const DEFAULT_SESSION: &str = "default";

/// Thread of one session. Locked for the whole relay so a session never has
/// two runs in flight.
pub type ThreadSlot = Arc<Mutex<Option<ThreadId>>>;

/// Remembered thread per session.
#[derive(Default)]
pub struct SessionThreads {
    slots: DashMap<String, ThreadSlot>,
}

impl SessionThreads {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot for `session`, created empty on first use.
    pub fn slot(&self, session: &str) -> ThreadSlot {
        self.slots
            .entry(session.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(None)))
            .clone()
    }

    /// Drops the session's slot when it still holds no thread and no other
    /// request is waiting on it. Call with `slot` locked and empty.
    pub fn release(&self, session: &str, slot: &ThreadSlot) {
        // Map entry plus the caller's clone. Any other clone is a waiter.
        let dropped = self
            .slots
            .remove_if(session, |_, kept| {
                Arc::ptr_eq(kept, slot) && Arc::strong_count(kept) == 2
            })
            .is_some();
        if dropped {
            trace!("Released empty slot of session {}", session);
        }
    }

    /// Forgets the session's thread. A relay still holding the old slot
    /// finishes on it, but later requests start from an empty one.
    pub fn reset(&self, session: &str) {
        if self.slots.remove(session).is_some() {
            info!("Thread reset for session {}", session);
        } else {
            debug!("Reset of session {} with no thread", session);
        }
        if self.is_empty() {
            trace!("No session holds a thread");
        }
    }

    /// Current thread of the session, without waiting for a relay in flight.
    #[cfg(test)]
    fn peek(&self, session: &str) -> Option<ThreadId> {
        let slot = self.slots.get(session)?.clone();
        let guard = slot.try_lock().ok()?;
        guard.clone()
    }

    /// Number of sessions with a slot.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
