//! # Job Manager
//!
//! A single-worker background job scheduler with concurrent-job admission.
//!
//! Long-running background work (incremental indexing, cache rebuilds, ...) is
//! queued and executed strictly in order by one dedicated worker thread.
//! Foreground callers that need to run their own job next to that stream
//! choose how it should relate to the background work:
//!
//! - **ForceImmediate**: pause the queue, let the in-flight job finish, run now
//! - **CancelIfNotReady**: give up immediately if anything is queued
//! - **WaitUntilReady**: wait (with optional timeout) for the queue to drain
//!
//! ## Key Features
//!
//! - **Strict FIFO**: one worker, one job at a time, in request order
//! - **Family discards**: cancel and drop every queued job of a family, waiting
//!   for the in-flight one to return
//! - **Enable gate**: nestable pause of dispatch without losing queued jobs
//! - **Duplicate suppression**: `request_if_not_waiting` for idempotent work
//! - **Error latch**: the fault that stopped the worker stays inspectable
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use job_manager::builders::SchedulerBuilder;
//! use job_manager::config::SchedulerConfig;
//! use job_manager::core::WaitPolicy;
//!
//! let scheduler = SchedulerBuilder::new(SchedulerConfig::new().with_name("indexer")).build()?;
//!
//! scheduler.request(Arc::new(IndexProject::new("core")))?;
//! scheduler.request_if_not_waiting(Arc::new(IndexProject::new("ui")))?;
//!
//! let status = scheduler.admit(
//!     Arc::new(SearchJob::new("fn main")),
//!     WaitPolicy::WaitUntilReady,
//!     None,
//!     Some(Duration::from_secs(5)),
//! )?;
//!
//! // Project closed: drop its pending indexing work.
//! scheduler.discard(Some("core"));
//!
//! if let Some(fault) = scheduler.last_error() {
//!     tracing::error!(error = %fault, "indexer stopped");
//! }
//! ```
//!
//! For complete examples, see `tests/scheduler_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core scheduling abstractions: jobs, queue, gate, and the scheduler.
pub mod core;
/// Configuration models for the scheduler.
pub mod config;
/// Builders to construct schedulers from configuration.
pub mod builders;
/// Runtime adapters (async facade).
pub mod runtime;
/// Shared utilities.
pub mod util;

pub use crate::core::{Job, JobScheduler, JobStatus, ProgressMonitor, SchedulerError, WaitPolicy};
