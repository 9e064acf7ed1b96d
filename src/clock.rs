//! Wall-clock seam so scheduling and lifecycle logic stay testable.

use std::sync::Mutex;

use time::OffsetDateTime;

/// Source of the current wall-clock time, provided by the environment.
pub trait Clock: Send + Sync {
    /// Current instant in UTC.
    fn now(&self) -> OffsetDateTime;
}

/// Production clock backed by the operating system.
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Manually driven clock for tests and simulations.
pub struct ManualClock {
    now: Mutex<OffsetDateTime>,
}

impl ManualClock {
    /// Create a clock frozen at the given instant.
    pub fn new(now: OffsetDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Jump to a new instant.
    pub fn set(&self, now: OffsetDateTime) {
        *self.now.lock().expect("clock poisoned") = now;
    }

    /// Move forward by the given duration.
    pub fn advance(&self, by: time::Duration) {
        let mut guard = self.now.lock().expect("clock poisoned");
        *guard += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> OffsetDateTime {
        *self.now.lock().expect("clock poisoned")
    }
}
