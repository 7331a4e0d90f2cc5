//! Nestable switch pausing job dispatch without dropping queued jobs.

/// Dispatch counter. Starts at 1; dispatch is allowed while it is positive.
///
/// Disables nest (the count may go negative). Enables beyond the matching
/// disables are refused so the count never exceeds 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnableGate {
    count: i32,
}

impl Default for EnableGate {
    fn default() -> Self {
        Self { count: 1 }
    }
}

impl EnableGate {
    /// Whether the worker may pick up the head job.
    #[must_use]
    pub const fn is_open(self) -> bool {
        self.count > 0
    }

    /// Current counter value.
    #[must_use]
    pub const fn count(self) -> i32 {
        self.count
    }

    /// Closes the gate one more level.
    pub const fn disable(&mut self) {
        self.count -= 1;
    }

    /// Reopens one level. Returns `false`, leaving the count at 1, when there
    /// was no matching disable.
    pub const fn enable(&mut self) -> bool {
        if self.count >= 1 {
            return false;
        }
        self.count += 1;
        true
    }
}
