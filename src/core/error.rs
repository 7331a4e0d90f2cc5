//! Error types for scheduler operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The job rejected itself in `ensure_ready_to_run`; it was never queued or run.
    #[error("invalid job: {0}")]
    InvalidJob(String),
    /// Admission was refused because the queue was busy, or the caller's monitor was cancelled.
    #[error("operation cancelled")]
    Cancelled,
    /// The background queue did not drain before the admission deadline.
    #[error("timed out after {0:?} waiting for background jobs")]
    TimedOut(Duration),
    /// A foreground job failed with a fault while running on the caller's thread.
    #[error("job failed: {0}")]
    Job(#[source] anyhow::Error),
    /// The worker thread could not be spawned.
    #[error("failed to start worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    /// Configuration validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Internal failure outside the scheduler proper (e.g. a blocking task join error).
    #[error("internal error: {0}")]
    Internal(String),
}

impl SchedulerError {
    /// True for the cancellation signal (busy queue or cancelled monitor).
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for the admission timeout signal.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// Application-facing result using anyhow, returned by [`Job::execute`](crate::core::Job::execute).
pub type AppResult<T> = Result<T, anyhow::Error>;
