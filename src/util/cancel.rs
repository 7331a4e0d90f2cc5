//! Shared cancellation flag for cooperative jobs and admitting callers.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::ProgressMonitor;

/// Clonable flag; all clones observe the same cancellation.
///
/// Jobs typically hold one and set it from [`Job::cancel`](crate::core::Job::cancel).
/// It also works as a bare [`ProgressMonitor`], letting a caller abort a
/// `WaitUntilReady` admission from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    /// Creates a flag that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Clears the flag so the owner can be run again.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::Release);
    }
}

impl ProgressMonitor for CancelFlag {
    fn is_cancelled(&self) -> bool {
        Self::is_cancelled(self)
    }
}
