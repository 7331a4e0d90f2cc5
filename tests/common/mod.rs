//! Shared helpers for scheduler integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use job_manager::config::SchedulerConfig;
use job_manager::core::{AppResult, Job, JobScheduler, JobStatus, ProgressMonitor, SchedulerError};
use job_manager::util::CancelFlag;
use parking_lot::Mutex;

/// Config with short delays so tests run quickly.
pub fn fast_config() -> SchedulerConfig {
    SchedulerConfig::new()
        .with_name("test-worker")
        .with_idle_delay_ms(10)
        .with_backoff_ms(2)
        .with_poll_interval_ms(5)
}

pub fn scheduler() -> JobScheduler {
    job_manager::util::init_tracing();
    JobScheduler::new(fast_config()).expect("valid config")
}

/// Polls `cond` until it holds or `timeout` elapses.
pub fn wait_for(timeout: Duration, cond: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Observations shared by all jobs of one test.
#[derive(Debug, Default)]
pub struct Probe {
    pub log: Mutex<Vec<String>>,
    pub active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl Probe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Complete,
    Fail,
    Fault,
    Panic,
}

/// Cooperative job that records when it runs.
#[derive(Debug)]
pub struct TestJob {
    pub name: String,
    pub family: &'static str,
    pub work: Duration,
    pub key: Option<String>,
    pub outcome: Outcome,
    pub invalid: bool,
    pub panic_on_cancel: bool,
    pub cancel: CancelFlag,
    pub cancel_calls: AtomicUsize,
    pub started: AtomicBool,
    pub finished: AtomicBool,
    probe: Arc<Probe>,
}

impl TestJob {
    pub fn new(name: impl Into<String>, family: &'static str, probe: &Arc<Probe>) -> Self {
        Self {
            name: name.into(),
            family,
            work: Duration::ZERO,
            key: None,
            outcome: Outcome::Complete,
            invalid: false,
            panic_on_cancel: false,
            cancel: CancelFlag::new(),
            cancel_calls: AtomicUsize::new(0),
            started: AtomicBool::new(false),
            finished: AtomicBool::new(false),
            probe: Arc::clone(probe),
        }
    }

    pub fn work_ms(mut self, ms: u64) -> Self {
        self.work = Duration::from_millis(ms);
        self
    }

    pub fn key(mut self, key: &str) -> Self {
        self.key = Some(key.to_string());
        self
    }

    pub fn outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = outcome;
        self
    }

    pub fn invalid(mut self) -> Self {
        self.invalid = true;
        self
    }

    pub fn panic_on_cancel(mut self) -> Self {
        self.panic_on_cancel = true;
        self
    }

    pub fn build(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn cancel_count(&self) -> usize {
        self.cancel_calls.load(Ordering::SeqCst)
    }

    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn has_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }
}

impl Job for TestJob {
    fn execute(&self, monitor: Option<&dyn ProgressMonitor>) -> AppResult<JobStatus> {
        self.started.store(true, Ordering::SeqCst);
        let now = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.max_active.fetch_max(now, Ordering::SeqCst);
        self.probe.log.lock().push(self.name.clone());

        let start = Instant::now();
        while start.elapsed() < self.work && !self.cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(2));
        }
        if let Some(monitor) = monitor {
            monitor.worked(1);
        }

        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        self.finished.store(true, Ordering::SeqCst);

        match self.outcome {
            Outcome::Complete => Ok(JobStatus::Complete),
            Outcome::Fail => Ok(JobStatus::Failed),
            Outcome::Fault => Err(anyhow::anyhow!("{} boom", self.name)),
            Outcome::Panic => panic!("{} exploded", self.name),
        }
    }

    fn cancel(&self) {
        self.cancel_calls.fetch_add(1, Ordering::SeqCst);
        assert!(!self.panic_on_cancel, "{} refused to cancel", self.name);
        self.cancel.cancel();
    }

    fn belongs_to(&self, family: &str) -> bool {
        self.family == family
    }

    fn ensure_ready_to_run(&self) -> Result<(), SchedulerError> {
        if self.invalid {
            return Err(SchedulerError::InvalidJob(format!("{} has no target", self.name)));
        }
        Ok(())
    }

    fn dedup_key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

/// Monitor recording everything reported to it.
#[derive(Debug, Default)]
pub struct RecordingMonitor {
    pub total: AtomicU32,
    pub worked: AtomicU32,
    pub done_calls: AtomicU32,
    pub sub_tasks: Mutex<Vec<String>>,
    pub cancel: CancelFlag,
}

impl ProgressMonitor for RecordingMonitor {
    fn begin_task(&self, _name: &str, total_work: u32) {
        self.total.store(total_work, Ordering::SeqCst);
    }

    fn worked(&self, work: u32) {
        self.worked.fetch_add(work, Ordering::SeqCst);
    }

    fn sub_task(&self, name: &str) {
        self.sub_tasks.lock().push(name.to_string());
    }

    fn done(&self) {
        self.done_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}
