//! Single-worker background job scheduler.
//!
//! One dedicated OS thread drains a FIFO queue of [`Job`]s, one at a time.
//! Caller threads add work with [`JobScheduler::request`] or run their own
//! job next to the background stream with [`JobScheduler::admit`], choosing a
//! [`WaitPolicy`].
//!
//! # Design
//!
//! - **One mutex**: queue, enable gate, in-flight job and awaiting-client
//!   count all live in one `parking_lot::Mutex`, paired with one `Condvar`
//!   notified on every enqueue, advance, enable and worker exit
//! - **Cooperative cancellation**: the scheduler only calls `Job::cancel` and
//!   waits; it never interrupts a running job
//! - **No shutdown**: the worker runs until a job faults; the fault is kept in
//!   an error latch for [`JobScheduler::last_error`]
//!
//! # Example
//!
//! ```rust,ignore
//! use job_manager::core::{JobScheduler, WaitPolicy};
//! use job_manager::config::SchedulerConfig;
//!
//! let scheduler = JobScheduler::new(SchedulerConfig::new().with_name("indexer"))?;
//! scheduler.request(Arc::new(IndexProject::new("core")))?;
//!
//! // Run a search once indexing has drained, waiting at most five seconds.
//! let status = scheduler.admit(search, WaitPolicy::WaitUntilReady, None, Some(Duration::from_secs(5)))?;
//! ```

mod admission;
mod worker;

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SchedulerConfig;
use crate::util::Priority;

use super::gate::EnableGate;
use super::job::{in_family, Job};
use super::latch::ErrorLatch;
use super::queue::JobQueue;
use super::SchedulerError;

/// How [`JobScheduler::admit`] treats a job while background work is queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitPolicy {
    /// Pause the background queue, wait out any in-flight job, then run.
    ForceImmediate,
    /// Fail with [`SchedulerError::Cancelled`] without touching the queue.
    CancelIfNotReady,
    /// Block until the queue drains (or the timeout expires), then run.
    WaitUntilReady,
}

/// Receives how long the worker has been idle, each time it re-checks an empty queue.
///
/// Runs on the worker thread, outside the scheduler lock.
pub trait IdleHandler: Send + Sync {
    /// Called with the time elapsed since the worker last found the queue empty.
    fn on_idle(&self, idle_for: Duration);
}

impl<F> IdleHandler for F
where
    F: Fn(Duration) + Send + Sync,
{
    fn on_idle(&self, idle_for: Duration) {
        self(idle_for);
    }
}

/// Snapshot of scheduler activity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Jobs accepted by `request`.
    pub requested: u64,
    /// Background jobs that returned [`JobStatus::Complete`](crate::core::JobStatus::Complete).
    pub completed: u64,
    /// Background jobs that returned [`JobStatus::Failed`](crate::core::JobStatus::Failed).
    pub failed: u64,
    /// Jobs cancelled by discards, in-flight ones included.
    pub discarded: u64,
    /// Foreground jobs run through `admit`.
    pub admitted: u64,
    /// Jobs in the queue right now.
    pub queued: usize,
    /// Callers currently inside a `WaitUntilReady` admission.
    pub awaiting_clients: usize,
    /// Whether the worker thread is running.
    pub worker_alive: bool,
}

#[derive(Debug, Default)]
struct Counters {
    requested: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    discarded: AtomicU64,
    admitted: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerState {
    NotStarted,
    Running,
    Terminated,
}

/// Everything guarded by the scheduler mutex.
struct State {
    queue: JobQueue,
    gate: EnableGate,
    /// Job the worker is executing; always the queue head while set.
    in_flight: Option<Arc<dyn Job>>,
    awaiting_clients: usize,
    worker: WorkerState,
    worker_thread: Option<ThreadId>,
}

impl State {
    fn current(&self) -> Option<Arc<dyn Job>> {
        if self.gate.is_open() {
            self.queue.head().cloned()
        } else {
            None
        }
    }

    /// Queue length, or 1 until the worker runs so early callers see pending work.
    fn depth(&self) -> usize {
        match self.worker {
            WorkerState::Running => self.queue.len(),
            WorkerState::NotStarted | WorkerState::Terminated => 1,
        }
    }
}

struct Shared {
    config: SchedulerConfig,
    state: Mutex<State>,
    /// Notified on enqueue, advance, enable and worker exit.
    changed: Condvar,
    /// Cuts the worker's post-idle delay short.
    delay_tx: Sender<()>,
    delay_rx: Receiver<()>,
    latch: ErrorLatch,
    worker_priority: AtomicU8,
    idle_handler: Option<Box<dyn IdleHandler>>,
    counters: Counters,
}

impl Shared {
    fn enable(&self) {
        let mut state = self.state.lock();
        if !state.gate.enable() {
            warn!(
                scheduler = %self.config.name,
                "enable() without a matching disable(); gate left open"
            );
        }
        drop(state);
        self.changed.notify_all();
    }

    fn notify_idle(&self, idle_for: Duration) {
        if let Some(handler) = &self.idle_handler {
            handler.on_idle(idle_for);
        }
    }
}

/// Handle to a background job scheduler.
///
/// Clones share the same queue and worker. The scheduler is constructed
/// explicitly and passed to whoever needs it; there is no global instance.
#[derive(Clone)]
pub struct JobScheduler {
    shared: Arc<Shared>,
}

/// Keeps the enable gate closed until dropped. See [`JobScheduler::pause`].
#[must_use = "the gate reopens as soon as the guard is dropped"]
pub struct PauseGuard<'a> {
    shared: &'a Shared,
}

impl Drop for PauseGuard<'_> {
    fn drop(&mut self) {
        self.shared.enable();
    }
}

impl JobScheduler {
    /// Creates a scheduler. The worker thread starts on first demand.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidConfig`] if the configuration is invalid.
    pub fn new(config: SchedulerConfig) -> Result<Self, SchedulerError> {
        Self::with_idle_handler(config, None)
    }

    pub(crate) fn with_idle_handler(
        config: SchedulerConfig,
        idle_handler: Option<Box<dyn IdleHandler>>,
    ) -> Result<Self, SchedulerError> {
        config.validate().map_err(SchedulerError::InvalidConfig)?;

        let (delay_tx, delay_rx) = bounded(1);
        let state = State {
            queue: JobQueue::new(config.initial_capacity),
            gate: EnableGate::default(),
            in_flight: None,
            awaiting_clients: 0,
            worker: WorkerState::NotStarted,
            worker_thread: None,
        };
        let worker_priority = AtomicU8::new(config.worker_priority.as_u8());

        Ok(Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(state),
                changed: Condvar::new(),
                delay_tx,
                delay_rx,
                latch: ErrorLatch::new(),
                worker_priority,
                idle_handler,
                counters: Counters::default(),
            }),
        })
    }

    /// The configuration this scheduler was built with.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Queues `job` for background execution and wakes the worker.
    ///
    /// # Errors
    ///
    /// - Whatever `job.ensure_ready_to_run()` returns; the queue is untouched
    /// - [`SchedulerError::Spawn`] if the worker thread could not be started
    pub fn request(&self, job: Arc<dyn Job>) -> Result<(), SchedulerError> {
        self.enqueue(job, false).map(|_| ())
    }

    /// Queues `job` unless an equal job is already waiting behind the head.
    ///
    /// Returns whether the job was queued. A job equal to the head (which may
    /// be running) is queued again.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request).
    pub fn request_if_not_waiting(&self, job: Arc<dyn Job>) -> Result<bool, SchedulerError> {
        self.enqueue(job, true)
    }

    /// Pending check and push happen under one lock so racing callers cannot
    /// both queue an equal job.
    fn enqueue(&self, job: Arc<dyn Job>, skip_if_pending: bool) -> Result<bool, SchedulerError> {
        job.ensure_ready_to_run()?;
        self.ensure_started()?;

        let mut state = self.shared.state.lock();
        if skip_if_pending && state.queue.contains_pending(&job) {
            debug!(job = ?job, "equal job already pending; not queued");
            return Ok(false);
        }
        debug!(job = ?job, depth = state.queue.len() + 1, "job requested");
        state.queue.push(job);
        drop(state);

        self.shared.counters.requested.fetch_add(1, Ordering::Relaxed);
        self.shared.changed.notify_all();
        Ok(true)
    }

    /// Whether a job equal to `job` is queued behind the head.
    #[must_use]
    pub fn is_pending(&self, job: &Arc<dyn Job>) -> bool {
        self.shared.state.lock().queue.contains_pending(job)
    }

    /// The head job if dispatch is enabled, else `None`. Returns the same job
    /// until it completes.
    #[must_use]
    pub fn current_job(&self) -> Option<Arc<dyn Job>> {
        self.shared.state.lock().current()
    }

    /// Number of queued jobs; 1 while the worker is not running.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.shared.state.lock().depth()
    }

    /// Whether the worker is inside a job's `execute`.
    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.shared.state.lock().in_flight.is_some()
    }

    /// Whether the worker thread is running.
    #[must_use]
    pub fn is_worker_alive(&self) -> bool {
        self.shared.state.lock().worker == WorkerState::Running
    }

    /// Callers currently blocked in a `WaitUntilReady` admission.
    #[must_use]
    pub fn awaiting_clients(&self) -> usize {
        self.shared.state.lock().awaiting_clients
    }

    /// Current logical priority of the worker.
    #[must_use]
    pub fn worker_priority(&self) -> Priority {
        Priority::from_u8(self.shared.worker_priority.load(Ordering::Acquire))
    }

    /// Current enable-gate counter (dispatch allowed while positive).
    #[must_use]
    pub fn enable_count(&self) -> i32 {
        self.shared.state.lock().gate.count()
    }

    /// Closes the enable gate one level. Pair with exactly one [`enable`](Self::enable).
    pub fn disable(&self) {
        self.shared.state.lock().gate.disable();
    }

    /// Reopens the enable gate one level and wakes the worker.
    pub fn enable(&self) {
        self.shared.enable();
    }

    /// Closes the gate until the returned guard is dropped.
    pub fn pause(&self) -> PauseGuard<'_> {
        self.disable();
        PauseGuard {
            shared: &self.shared,
        }
    }

    /// The fault that stopped the worker, if any.
    #[must_use]
    pub fn last_error(&self) -> Option<Arc<anyhow::Error>> {
        self.shared.latch.get()
    }

    /// Cancels and removes every job in `family` (`None` for all jobs).
    ///
    /// If the in-flight or head job is in the family it is cancelled and this
    /// call blocks until its `execute` has returned. The gate stays closed for
    /// the whole operation and is reopened even if a `cancel` panics.
    /// Returns the number of jobs cancelled.
    pub fn discard(&self, family: Option<&str>) -> usize {
        let current = {
            let mut state = self.shared.state.lock();
            let current = state.in_flight.clone().or_else(|| state.current());
            state.gate.disable();
            current
        };
        let _paused = PauseGuard {
            shared: &self.shared,
        };

        let mut cancelled = 0;
        let mut waited_on = None;
        if let Some(job) = current.filter(|job| in_family(job.as_ref(), family)) {
            job.cancel();
            cancelled += 1;

            let mut state = self.shared.state.lock();
            while state.worker == WorkerState::Running
                && state.in_flight.as_ref().is_some_and(|j| Arc::ptr_eq(j, &job))
            {
                self.shared.changed.wait(&mut state);
            }
            drop(state);
            waited_on = Some(job);
        }

        let removed = self.shared.state.lock().queue.drain_family(family);
        for job in &removed {
            if waited_on.as_ref().is_some_and(|w| Arc::ptr_eq(w, job)) {
                continue;
            }
            job.cancel();
            cancelled += 1;
        }

        self.shared
            .counters
            .discarded
            .fetch_add(u64::try_from(cancelled).unwrap_or(u64::MAX), Ordering::Relaxed);
        info!(
            scheduler = %self.shared.config.name,
            family = family.unwrap_or("*"),
            cancelled = cancelled,
            "discarded jobs"
        );
        cancelled
    }

    /// Discards every job, clears the error latch and makes sure the worker started.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::Spawn`] if the worker thread could not be started.
    pub fn reset(&self) -> Result<(), SchedulerError> {
        self.discard(None);
        self.shared.latch.clear();
        self.ensure_started()
    }

    /// Current statistics.
    #[must_use]
    pub fn stats(&self) -> SchedulerStats {
        let (queued, awaiting_clients, worker_alive) = {
            let state = self.shared.state.lock();
            (
                state.queue.len(),
                state.awaiting_clients,
                state.worker == WorkerState::Running,
            )
        };
        let counters = &self.shared.counters;
        SchedulerStats {
            requested: counters.requested.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            discarded: counters.discarded.load(Ordering::Relaxed),
            admitted: counters.admitted.load(Ordering::Relaxed),
            queued,
            awaiting_clients,
            worker_alive,
        }
    }

    /// Whether the caller is the worker thread, i.e. a background job calling back in.
    fn on_worker_thread(&self) -> bool {
        self.shared.state.lock().worker_thread == Some(thread::current().id())
    }

    /// Starts the worker thread unless it was started before. A worker that
    /// terminated is not restarted.
    fn ensure_started(&self) -> Result<(), SchedulerError> {
        let mut state = self.shared.state.lock();
        if state.worker != WorkerState::NotStarted {
            return Ok(());
        }

        let shared = Arc::clone(&self.shared);
        let mut builder = thread::Builder::new().name(self.shared.config.name.clone());
        if let Some(stack_size) = self.shared.config.stack_size {
            builder = builder.stack_size(stack_size);
        }
        let handle = builder.spawn(move || worker::run(&shared))?;

        state.worker = WorkerState::Running;
        state.worker_thread = Some(handle.thread().id());
        info!(
            scheduler = %self.shared.config.name,
            priority = ?self.shared.config.worker_priority,
            "background worker started"
        );
        Ok(())
    }
}

impl fmt::Display for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const SHOWN: usize = 15;
        let state = self.shared.state.lock();
        writeln!(f, "Enable count: {}", state.gate.count())?;
        writeln!(f, "Jobs in queue: {}", state.queue.len())?;
        for (i, job) in state.queue.iter().take(SHOWN).enumerate() {
            writeln!(f, "{i} - job[{i}]: {job:?}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for JobScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JobScheduler")
            .field("name", &self.shared.config.name)
            .field("stats", &self.stats())
            .finish()
    }
}
