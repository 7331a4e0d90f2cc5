//! Write-once holder for the fault that stopped the worker.

use std::sync::Arc;

use parking_lot::Mutex;

/// Keeps the first fault recorded; later faults are ignored until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct ErrorLatch {
    slot: Mutex<Option<Arc<anyhow::Error>>>,
}

impl ErrorLatch {
    /// Creates an empty latch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `error` if the latch is empty. Returns whether it was stored.
    pub fn record(&self, error: anyhow::Error) -> bool {
        let mut slot = self.slot.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Arc::new(error));
        true
    }

    /// The recorded fault, if any. Does not consume it.
    #[must_use]
    pub fn get(&self) -> Option<Arc<anyhow::Error>> {
        self.slot.lock().clone()
    }

    /// Empties the latch.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }
}
