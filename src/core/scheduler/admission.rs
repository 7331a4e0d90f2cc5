//! Running a caller's job alongside the background queue.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::core::monitor::SubMonitor;
use crate::core::{AppResult, Job, JobStatus, ProgressMonitor, SchedulerError};
use crate::util::Priority;

use super::{JobScheduler, Shared, WaitPolicy, WorkerState};

/// Work units an admission reports against the caller's monitor.
const ADMISSION_WORK: u32 = 100;

/// Registers a `WaitUntilReady` caller; undone on drop on every exit path.
struct AwaitingClient<'a> {
    shared: &'a Shared,
}

impl<'a> AwaitingClient<'a> {
    fn enter(shared: &'a Shared, caller: Priority) -> Self {
        let mut state = shared.state.lock();
        state.awaiting_clients += 1;
        if state.worker == WorkerState::Running {
            shared
                .worker_priority
                .fetch_max(caller.as_u8(), Ordering::AcqRel);
        }
        drop(state);
        Self { shared }
    }
}

impl Drop for AwaitingClient<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.state.lock();
        state.awaiting_clients = state.awaiting_clients.saturating_sub(1);
        if state.awaiting_clients == 0 {
            self.shared
                .worker_priority
                .store(self.shared.config.worker_priority.as_u8(), Ordering::Release);
        }
    }
}

impl JobScheduler {
    /// Runs `job` on the calling thread with a defined relationship to the
    /// background queue.
    ///
    /// When the queue is empty the job runs straight away. Otherwise `policy`
    /// decides:
    ///
    /// - [`WaitPolicy::ForceImmediate`]: close the gate, wait for any in-flight
    ///   background job to return, run `job`, reopen the gate
    /// - [`WaitPolicy::CancelIfNotReady`]: fail with [`SchedulerError::Cancelled`]
    /// - [`WaitPolicy::WaitUntilReady`]: wait for the queue to drain, raising the
    ///   worker's priority to the caller's meanwhile; `timeout` of `None` or zero
    ///   waits forever
    ///
    /// Distinct foreground jobs admitted at the same time are not serialized
    /// against each other. A background job admitting from its own `execute`
    /// runs the admitted job inline under `ForceImmediate` and
    /// `WaitUntilReady`, since the worker cannot make progress until it returns.
    ///
    /// The caller's monitor is closed with `done` on every outcome.
    ///
    /// # Errors
    ///
    /// - Whatever `job.ensure_ready_to_run()` returns
    /// - [`SchedulerError::Cancelled`] for a busy queue under `CancelIfNotReady`,
    ///   or when `monitor` is cancelled during the wait
    /// - [`SchedulerError::TimedOut`] when the queue did not drain in time; `job` did not run
    /// - [`SchedulerError::Job`] when `job` itself faulted
    /// - [`SchedulerError::Spawn`] if the worker thread could not be started
    pub fn admit(
        &self,
        job: Arc<dyn Job>,
        policy: WaitPolicy,
        monitor: Option<&dyn ProgressMonitor>,
        timeout: Option<Duration>,
    ) -> Result<JobStatus, SchedulerError> {
        job.ensure_ready_to_run()?;
        self.ensure_started()?;

        if let Some(monitor) = monitor {
            monitor.begin_task("", ADMISSION_WORK);
        }
        let result = self.admit_started(job.as_ref(), policy, monitor, timeout);
        if let Some(monitor) = monitor {
            monitor.done();
        }
        result
    }

    fn admit_started(
        &self,
        job: &dyn Job,
        policy: WaitPolicy,
        monitor: Option<&dyn ProgressMonitor>,
        timeout: Option<Duration>,
    ) -> Result<JobStatus, SchedulerError> {
        let mut remaining_work = ADMISSION_WORK;
        if self.depth() == 0 {
            return self.run_foreground(job, monitor, remaining_work);
        }

        // A background job admitting work of its own: the worker is blocked in
        // this call, so nothing else can be executing and the queue cannot
        // drain until it returns.
        let nested = self.on_worker_thread();

        match policy {
            WaitPolicy::ForceImmediate => {
                let _paused = self.pause();
                if !nested {
                    self.wait_for_in_flight();
                }
                debug!(job = ?job, nested = nested, "running job with background queue paused");
                self.run_foreground(job, monitor, remaining_work)
            }
            WaitPolicy::CancelIfNotReady => {
                debug!(job = ?job, "background queue busy; admission refused");
                Err(SchedulerError::Cancelled)
            }
            WaitPolicy::WaitUntilReady if nested => {
                debug!(job = ?job, "admitted from the worker thread; running without waiting");
                self.run_foreground(job, monitor, remaining_work)
            }
            WaitPolicy::WaitUntilReady => {
                if self.wait_until_drained(monitor, timeout)? {
                    remaining_work /= 2;
                }
                self.run_foreground(job, monitor, remaining_work)
            }
        }
    }

    /// Blocks until the background queue has drained.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Cancelled`] if `monitor` is cancelled while waiting.
    pub fn wait_until_ready(&self, monitor: Option<&dyn ProgressMonitor>) -> Result<(), SchedulerError> {
        self.admit(Arc::new(WaitUntilReadyJob), WaitPolicy::WaitUntilReady, monitor, None)
            .map(|_| ())
    }

    fn run_foreground(
        &self,
        job: &dyn Job,
        monitor: Option<&dyn ProgressMonitor>,
        work: u32,
    ) -> Result<JobStatus, SchedulerError> {
        self.shared.counters.admitted.fetch_add(1, Ordering::Relaxed);
        let result = match monitor {
            Some(parent) => job.execute(Some(&SubMonitor::new(parent, work))),
            None => job.execute(None),
        };
        result.map_err(SchedulerError::Job)
    }

    /// Waits until the worker is not inside a job's `execute`.
    fn wait_for_in_flight(&self) {
        let mut state = self.shared.state.lock();
        while state.worker == WorkerState::Running && state.in_flight.is_some() {
            self.shared.changed.wait(&mut state);
        }
    }

    /// Waits for depth zero. Returns whether progress was reported to a sub-monitor.
    fn wait_until_drained(
        &self,
        monitor: Option<&dyn ProgressMonitor>,
        timeout: Option<Duration>,
    ) -> Result<bool, SchedulerError> {
        let start = Instant::now();
        let deadline = timeout.filter(|t| !t.is_zero());
        let poll = self.shared.config.poll_interval();

        let total = self.depth();
        let progress = monitor.filter(|_| total > 0).map(|parent| {
            let sub = SubMonitor::new(parent, ADMISSION_WORK / 2);
            sub.begin_task("", u32::try_from(total).unwrap_or(u32::MAX));
            sub
        });
        // Registered before the wake-up so the worker either skips its delay
        // or receives this token.
        let _client = AwaitingClient::enter(&self.shared, Priority::current());
        let _ = self.shared.delay_tx.try_send(());
        let mut previous: Option<Arc<dyn Job>> = None;

        loop {
            let (depth, current) = {
                let state = self.shared.state.lock();
                (state.depth(), state.current())
            };
            if depth == 0 {
                break;
            }
            if let Some(limit) = deadline {
                if start.elapsed() >= limit {
                    warn!(
                        timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                        depth = depth,
                        "background queue did not drain before timeout"
                    );
                    return Err(SchedulerError::TimedOut(limit));
                }
            }
            if let Some(sub) = &progress {
                if sub.is_cancelled() {
                    return Err(SchedulerError::Cancelled);
                }
                // Head can be None while jobs are queued but the gate is closed.
                if let Some(current) = current {
                    if !previous.as_ref().is_some_and(|p| Arc::ptr_eq(p, &current)) {
                        sub.sub_task(&format!("{depth} jobs remaining"));
                        sub.worked(1);
                        previous = Some(current);
                    }
                }
            }

            let wait = deadline.map_or(poll, |limit| {
                poll.min(limit.saturating_sub(start.elapsed()))
            });
            let mut state = self.shared.state.lock();
            if state.depth() > 0 {
                self.shared.changed.wait_for(&mut state, wait);
            }
        }

        if let Some(sub) = &progress {
            sub.done();
        }
        Ok(progress.is_some())
    }
}

/// No-op job admitted by [`JobScheduler::wait_until_ready`].
#[derive(Debug)]
struct WaitUntilReadyJob;

impl Job for WaitUntilReadyJob {
    fn execute(&self, _monitor: Option<&dyn ProgressMonitor>) -> AppResult<JobStatus> {
        Ok(JobStatus::Complete)
    }

    fn cancel(&self) {}

    fn belongs_to(&self, _family: &str) -> bool {
        false
    }
}
