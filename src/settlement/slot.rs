//! Single-slot settlement signal
//!
//! Holds at most one content id awaiting settlement. A newer announcement
//! replaces an unsettled older one; the replaced id is returned to the
//! caller so it can be logged. Waiters are woken through a `Notify`, so a
//! `mark_ready` that lands before anyone waits is not lost.

use std::sync::Mutex;
use tokio::sync::Notify;

use crate::types::ContentId;

#[derive(Debug, Default)]
pub struct SettlementSlot {
    pending: Mutex<Option<ContentId>>,
    notify: Notify,
}

impl SettlementSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `id` and wake the dispatcher.
    ///
    /// Returns the unsettled id it replaced, if any.
    pub fn mark_ready(&self, id: ContentId) -> Option<ContentId> {
        let superseded = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(id);
        self.notify.notify_one();
        superseded
    }

    /// Clear the slot, returning its id.
    pub fn take(&self) -> Option<ContentId> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).take()
    }

    pub fn is_ready(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Wait until an id is available and take it.
    ///
    /// The slot is already clear when this returns.
    pub async fn wait_ready(&self) -> ContentId {
        loop {
            if let Some(id) = self.take() {
                return id;
            }
            self.notify.notified().await;
        }
    }
}
