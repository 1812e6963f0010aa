use std::time::Duration;

/// Single pending deadline that can be armed, cancelled and fired
///
/// Time is passed in as epoch milliseconds, so the owner decides whether it
/// comes from the wall clock (live) or from message timestamps (replay).
#[derive(Debug, Clone)]
pub struct DebounceTimer {
    delay_ms: i64,
    deadline: Option<i64>,
}

impl DebounceTimer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_ms: i64::try_from(delay.as_millis()).unwrap_or(i64::MAX),
            deadline: None,
        }
    }

    /// Start (or restart) the countdown from `now`
    pub fn arm(&mut self, now: i64) {
        self.deadline = Some(now.saturating_add(self.delay_ms));
    }

    /// Drop the pending deadline. Returns whether one was pending.
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn deadline(&self) -> Option<i64> {
        self.deadline
    }

    /// True exactly once per armed deadline, when `now` has reached it
    pub fn fire_if_due(&mut self, now: i64) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
