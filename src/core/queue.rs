//! FIFO storage for pending background jobs.

use std::collections::VecDeque;
use std::sync::Arc;

use super::job::{in_family, same_job, Job};

/// Ordered queue of pending jobs. Insertion order is execution order.
///
/// The queue itself is not synchronized; [`JobScheduler`](crate::core::JobScheduler)
/// keeps it behind its state mutex. The head stays in place while it runs and
/// is only removed by [`advance`](Self::advance).
#[derive(Debug)]
pub struct JobQueue {
    jobs: VecDeque<Arc<dyn Job>>,
}

impl JobQueue {
    /// Creates an empty queue with room for `capacity` jobs before growing.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(capacity),
        }
    }

    /// Appends a job at the tail.
    pub fn push(&mut self, job: Arc<dyn Job>) {
        self.jobs.push_back(job);
    }

    /// The job at the head, if any.
    #[must_use]
    pub fn head(&self) -> Option<&Arc<dyn Job>> {
        self.jobs.front()
    }

    /// Removes and returns the head job.
    pub fn advance(&mut self) -> Option<Arc<dyn Job>> {
        self.jobs.pop_front()
    }

    /// Number of queued jobs, head included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// True when nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Whether a job equal to `job` is queued behind the head.
    ///
    /// The head is skipped because it may already be running; an equal job can
    /// therefore be queued again while its twin executes.
    #[must_use]
    pub fn contains_pending(&self, job: &Arc<dyn Job>) -> bool {
        self.jobs.iter().skip(1).any(|queued| same_job(queued, job))
    }

    /// Removes every job selected by `family` (all jobs for `None`) and returns
    /// them in queue order. Survivors keep their relative order.
    pub fn drain_family(&mut self, family: Option<&str>) -> Vec<Arc<dyn Job>> {
        let mut removed = Vec::new();
        self.jobs.retain(|job| {
            if in_family(job.as_ref(), family) {
                removed.push(Arc::clone(job));
                false
            } else {
                true
            }
        });
        removed
    }

    /// Iterates over queued jobs from head to tail.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Job>> {
        self.jobs.iter()
    }
}
