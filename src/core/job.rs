//! The unit of work the scheduler runs, queues, and cancels.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::monitor::ProgressMonitor;
use super::{AppResult, SchedulerError};

/// Outcome of a job run that did not fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// The job did its work.
    Complete,
    /// The job gave up without faulting. The scheduler does not retry it.
    Failed,
}

impl JobStatus {
    /// True for [`JobStatus::Complete`].
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl From<bool> for JobStatus {
    fn from(ok: bool) -> Self {
        if ok {
            Self::Complete
        } else {
            Self::Failed
        }
    }
}

/// A cancellable, family-classified unit of background work.
///
/// Jobs are shared as `Arc<dyn Job>`: the queue, the worker and any caller
/// asking [`is_pending`](crate::core::JobScheduler::is_pending) all hold the
/// same allocation. Cancellation is cooperative only; `execute` must poll
/// whatever flag `cancel` sets.
///
/// # Example
///
/// ```rust,ignore
/// use job_manager::core::{AppResult, Job, JobStatus, ProgressMonitor};
/// use job_manager::util::CancelFlag;
///
/// #[derive(Debug)]
/// struct IndexProject {
///     project: String,
///     cancel: CancelFlag,
/// }
///
/// impl Job for IndexProject {
///     fn execute(&self, _monitor: Option<&dyn ProgressMonitor>) -> AppResult<JobStatus> {
///         for file in files_of(&self.project) {
///             if self.cancel.is_cancelled() {
///                 return Ok(JobStatus::Failed);
///             }
///             index(file)?;
///         }
///         Ok(JobStatus::Complete)
///     }
///
///     fn cancel(&self) {
///         self.cancel.cancel();
///     }
///
///     fn belongs_to(&self, family: &str) -> bool {
///         self.project == family
///     }
/// }
/// ```
pub trait Job: Send + Sync + fmt::Debug {
    /// Runs the job. Background jobs receive `None`; admitted jobs receive the
    /// caller's monitor (scaled) when one was supplied.
    ///
    /// # Errors
    ///
    /// An `Err` is a fault. On the worker thread it stops the worker for good
    /// and is kept in the scheduler's error latch.
    fn execute(&self, monitor: Option<&dyn ProgressMonitor>) -> AppResult<JobStatus>;

    /// Requests cooperative cancellation. Must not block; may be called from any thread.
    fn cancel(&self);

    /// Whether the job is part of `family`, for bulk discards.
    fn belongs_to(&self, family: &str) -> bool;

    /// Precondition checked before the job is queued or admitted.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidJob`] when the job must not be scheduled.
    fn ensure_ready_to_run(&self) -> Result<(), SchedulerError> {
        Ok(())
    }

    /// Value identity used for duplicate suppression. Two jobs with equal
    /// `Some` keys are treated as the same work; `None` falls back to
    /// reference identity.
    fn dedup_key(&self) -> Option<&str> {
        None
    }
}

/// Equality the queue uses: same allocation, or equal dedup keys.
#[must_use]
pub fn same_job(a: &Arc<dyn Job>, b: &Arc<dyn Job>) -> bool {
    if Arc::ptr_eq(a, b) {
        return true;
    }
    matches!((a.dedup_key(), b.dedup_key()), (Some(x), Some(y)) if x == y)
}

/// Whether `job` is selected by `family`, where `None` selects every job.
pub(crate) fn in_family(job: &dyn Job, family: Option<&str>) -> bool {
    family.is_none_or(|name| job.belongs_to(name))
}
