//! The worker loop: drains the queue one job at a time until a job faults.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use anyhow::anyhow;
use tracing::{debug, error, trace};

use crate::core::JobStatus;
use crate::util::Priority;

use super::{Shared, WorkerState};

/// Thread entry point. Records the terminating fault and marks the worker dead.
pub(super) fn run(shared: &Shared) {
    debug!(scheduler = %shared.config.name, "worker loop entered");

    let fault = match panic::catch_unwind(AssertUnwindSafe(|| work(shared))) {
        Ok(fault) => fault,
        Err(payload) => anyhow!("worker loop panicked: {}", panic_message(payload.as_ref())),
    };

    error!(
        scheduler = %shared.config.name,
        error = %fault,
        "background worker terminated; no further jobs will run"
    );
    shared.latch.record(fault);

    let mut state = shared.state.lock();
    state.worker = WorkerState::Terminated;
    state.in_flight = None;
    drop(state);
    shared.changed.notify_all();
}

/// Loops forever; only returns the fault that ends it.
fn work(shared: &Shared) -> anyhow::Error {
    let mut idling_since: Option<Instant> = None;
    let mut applied: Option<Priority> = None;

    loop {
        let job = {
            let mut state = shared.state.lock();
            let job = state.current();
            if let Some(job) = &job {
                state.in_flight = Some(Arc::clone(job));
            }
            job
        };

        let Some(job) = job else {
            match idling_since {
                None => idling_since = Some(Instant::now()),
                Some(since) => shared.notify_idle(since.elapsed()),
            }

            {
                let mut state = shared.state.lock();
                if state.current().is_none() {
                    shared.changed.wait(&mut state);
                }
            }

            if let Some(since) = idling_since {
                shared.notify_idle(since.elapsed());
            }
            delay_after_idle(shared);
            continue;
        };
        idling_since = None;

        apply_priority(shared, &mut applied);
        debug!(job = ?job, "executing background job");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| job.execute(None)));
        // Counted before the advance so a drained queue implies settled stats.
        match &outcome {
            Ok(Ok(JobStatus::Complete)) => {
                shared.counters.completed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Ok(JobStatus::Failed)) => {
                shared.counters.failed.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Err(_)) | Err(_) => {}
        }

        let waiting_clients = {
            let mut state = shared.state.lock();
            state.in_flight = None;
            if state.queue.head().is_some_and(|head| Arc::ptr_eq(head, &job)) {
                state.queue.advance();
            }
            state.awaiting_clients
        };
        shared.changed.notify_all();

        match outcome {
            Ok(Ok(JobStatus::Complete)) => debug!(job = ?job, "background job completed"),
            Ok(Ok(JobStatus::Failed)) => debug!(job = ?job, "background job reported failure"),
            Ok(Err(fault)) => return fault.context(format!("background job {job:?} faulted")),
            Err(payload) => {
                return anyhow!(
                    "background job {job:?} panicked: {}",
                    panic_message(payload.as_ref())
                );
            }
        }

        if waiting_clients == 0 {
            trace!("no waiting clients; backing off");
            thread::sleep(shared.config.backoff());
        }
    }
}

/// Just woke up: give recently scheduled foreground work a head start unless
/// a waiting caller cuts the delay short.
fn delay_after_idle(shared: &Shared) {
    {
        let state = shared.state.lock();
        if state.awaiting_clients > 0 {
            return;
        }
        // With nobody waiting, any token left in the channel was meant for an
        // earlier delay. Cleared under the lock: waiting callers register
        // before they send.
        while shared.delay_rx.try_recv().is_ok() {}
    }
    let _ = shared.delay_rx.recv_timeout(shared.config.idle_delay());
}

/// Moves the OS thread to the priority waiting callers asked for.
fn apply_priority(shared: &Shared, applied: &mut Option<Priority>) {
    let wanted = Priority::from_u8(shared.worker_priority.load(Ordering::Acquire));
    if *applied == Some(wanted) {
        return;
    }
    match wanted.apply_to_current_thread() {
        Ok(()) => debug!(priority = ?wanted, "worker thread priority changed"),
        // Raising priority usually needs privileges; the job still runs.
        Err(e) => debug!(priority = ?wanted, error = ?e, "could not change worker thread priority"),
    }
    *applied = Some(wanted);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
