//! Thread priorities for the worker and its callers.
//!
//! `WaitUntilReady` callers raise the worker's priority to their own and the
//! last one to leave restores the configured baseline. The worker moves its OS
//! thread to the requested level through `thread-priority` before each job.
//! Callers declare their own level per thread with [`Priority::set_current`].

use std::cell::Cell;

use serde::{Deserialize, Serialize};
use thread_priority::{set_current_thread_priority, ThreadPriority, ThreadPriorityValue};

/// Priority level, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Priority {
    /// Background work nobody is waiting on.
    Low = 0,
    /// Default level of caller threads.
    #[default]
    Normal = 1,
    /// Interactive work.
    High = 2,
    /// Must not be delayed.
    Critical = 3,
}

thread_local! {
    static CURRENT: Cell<Priority> = const { Cell::new(Priority::Normal) };
}

impl Priority {
    /// Priority declared by the calling thread ([`Priority::Normal`] unless set).
    #[must_use]
    pub fn current() -> Self {
        CURRENT.with(Cell::get)
    }

    /// Declares the calling thread's priority.
    pub fn set_current(priority: Self) {
        CURRENT.with(|cell| cell.set(priority));
    }

    /// Raw value, for atomic storage.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Inverse of [`as_u8`](Self::as_u8); out-of-range values saturate to `Critical`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Low,
            1 => Self::Normal,
            2 => Self::High,
            _ => Self::Critical,
        }
    }

    /// OS-level priority this level maps to.
    #[must_use]
    pub fn thread_priority(self) -> ThreadPriority {
        match self {
            Self::Low => ThreadPriority::Min,
            Self::Normal => crossplatform(50),
            Self::High => crossplatform(75),
            Self::Critical => ThreadPriority::Max,
        }
    }

    /// Sets the calling thread's OS priority to this level.
    ///
    /// # Errors
    ///
    /// Fails when the platform refuses the change, typically when raising
    /// priority without the needed privileges.
    pub fn apply_to_current_thread(self) -> Result<(), thread_priority::Error> {
        set_current_thread_priority(self.thread_priority())
    }
}

fn crossplatform(value: u8) -> ThreadPriority {
    ThreadPriorityValue::try_from(value).map_or(ThreadPriority::Min, ThreadPriority::Crossplatform)
}
