//! Async facade over [`JobScheduler`].
//!
//! Admission and discard block the calling thread, so these wrappers move
//! them onto tokio's blocking pool and await the result.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{Job, JobScheduler, JobStatus, ProgressMonitor, SchedulerError, WaitPolicy};

/// Async form of [`JobScheduler::admit`].
///
/// # Errors
///
/// Same as [`JobScheduler::admit`], plus [`SchedulerError::Internal`] if the
/// blocking task could not be joined.
pub async fn admit_async(
    scheduler: &JobScheduler,
    job: Arc<dyn Job>,
    policy: WaitPolicy,
    monitor: Option<Arc<dyn ProgressMonitor>>,
    timeout: Option<Duration>,
) -> Result<JobStatus, SchedulerError> {
    let scheduler = scheduler.clone();
    tokio::task::spawn_blocking(move || scheduler.admit(job, policy, monitor.as_deref(), timeout))
        .await
        .map_err(|e| SchedulerError::Internal(format!("admission task failed: {e}")))?
}

/// Async form of [`JobScheduler::discard`]. Resolves once in-flight family
/// members have returned.
///
/// # Errors
///
/// [`SchedulerError::Internal`] if the blocking task could not be joined.
pub async fn discard_async(
    scheduler: &JobScheduler,
    family: Option<String>,
) -> Result<usize, SchedulerError> {
    let scheduler = scheduler.clone();
    tokio::task::spawn_blocking(move || scheduler.discard(family.as_deref()))
        .await
        .map_err(|e| SchedulerError::Internal(format!("discard task failed: {e}")))
}

/// Async form of [`JobScheduler::wait_until_ready`].
///
/// # Errors
///
/// Same as [`JobScheduler::wait_until_ready`], plus [`SchedulerError::Internal`].
pub async fn wait_until_ready_async(
    scheduler: &JobScheduler,
    monitor: Option<Arc<dyn ProgressMonitor>>,
) -> Result<(), SchedulerError> {
    let scheduler = scheduler.clone();
    tokio::task::spawn_blocking(move || scheduler.wait_until_ready(monitor.as_deref()))
        .await
        .map_err(|e| SchedulerError::Internal(format!("wait task failed: {e}")))?
}
