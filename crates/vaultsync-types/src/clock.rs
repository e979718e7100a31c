use std::sync::Mutex;

use crate::timestamp::Timestamp;

/// Source of the current timestamp.
///
/// Injected wherever nodes stamp their creation or modification time, so
/// that merges and mutations are deterministic under test. Production code
/// uses [`SystemClock`]; tests use [`ManualClock`].
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in the local offset.
#[derive(Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Create a new system clock.
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. For tests.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<Timestamp>,
}

impl ManualClock {
    /// Create a manual clock pinned to the given time.
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Pin the clock to a specific time.
    pub fn set(&self, ts: Timestamp) {
        *self.current.lock().expect("clock mutex poisoned") = ts;
    }

    /// Move the clock forward by the given number of milliseconds.
    pub fn advance_millis(&self, millis: i64) {
        let mut current = self.current.lock().expect("clock mutex poisoned");
        *current = current.plus_millis(millis);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock().expect("clock mutex poisoned")
    }
}
