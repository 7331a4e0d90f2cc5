//! Core scheduling abstractions: jobs, the queue, and the scheduler.

pub mod error;
pub mod gate;
pub mod job;
pub mod latch;
pub mod monitor;
pub mod queue;
pub mod scheduler;

pub use error::{AppResult, SchedulerError};
pub use gate::EnableGate;
pub use job::{same_job, Job, JobStatus};
pub use latch::ErrorLatch;
pub use monitor::{ProgressMonitor, SubMonitor};
pub use queue::JobQueue;
pub use scheduler::{IdleHandler, JobScheduler, PauseGuard, SchedulerStats, WaitPolicy};
