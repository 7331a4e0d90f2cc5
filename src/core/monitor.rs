//! Progress reporting and cooperative cancellation seen by jobs and admitting callers.

use parking_lot::Mutex;

/// Progress sink supplied by callers of [`JobScheduler::admit`](crate::core::JobScheduler::admit).
///
/// All reporting methods default to no-ops so a monitor that only carries a
/// cancellation signal needs to implement `is_cancelled` alone. The scheduler
/// always accepts `None` in place of a monitor.
pub trait ProgressMonitor: Send + Sync {
    /// Starts a task of `total_work` units.
    fn begin_task(&self, _name: &str, _total_work: u32) {}

    /// Reports `work` additional units as done.
    fn worked(&self, _work: u32) {}

    /// Names the current step of the task.
    fn sub_task(&self, _name: &str) {}

    /// Marks the task finished.
    fn done(&self) {}

    /// Whether the owner of this monitor asked for the operation to stop.
    fn is_cancelled(&self) -> bool;
}

#[derive(Debug)]
struct SubState {
    total: u32,
    worked: u32,
    reported: u32,
}

/// Monitor that maps its own work units onto `ticks` units of a parent monitor.
///
/// Cancellation is read through from the parent.
pub struct SubMonitor<'a> {
    parent: &'a dyn ProgressMonitor,
    ticks: u32,
    state: Mutex<SubState>,
}

impl<'a> SubMonitor<'a> {
    /// Creates a child that will consume `ticks` of the parent's work units.
    pub fn new(parent: &'a dyn ProgressMonitor, ticks: u32) -> Self {
        Self {
            parent,
            ticks,
            state: Mutex::new(SubState {
                total: 1,
                worked: 0,
                reported: 0,
            }),
        }
    }

    fn forward(&self, state: &mut SubState) {
        let target = u32::try_from(
            u64::from(self.ticks) * u64::from(state.worked) / u64::from(state.total),
        )
        .unwrap_or(self.ticks);
        if target > state.reported {
            self.parent.worked(target - state.reported);
            state.reported = target;
        }
    }
}

impl ProgressMonitor for SubMonitor<'_> {
    fn begin_task(&self, name: &str, total_work: u32) {
        let mut state = self.state.lock();
        state.total = total_work.max(1);
        state.worked = 0;
        drop(state);
        if !name.is_empty() {
            self.parent.sub_task(name);
        }
    }

    fn worked(&self, work: u32) {
        let mut state = self.state.lock();
        state.worked = state.worked.saturating_add(work).min(state.total);
        self.forward(&mut state);
    }

    fn sub_task(&self, name: &str) {
        self.parent.sub_task(name);
    }

    fn done(&self) {
        let mut state = self.state.lock();
        state.worked = state.total;
        self.forward(&mut state);
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }
}
