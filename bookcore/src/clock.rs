//! Clock abstraction.
//!
//! Lifecycle operations never call `Utc::now()` directly; they take their
//! notion of "now" from a [`Clock`] so tests can pin time and exercise
//! past-dated booking rules deterministically.

use std::sync::{Arc, Mutex};

use chrono::Duration;

use crate::types::Timestamp;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// The current moment.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock pinned to an explicit instant, advanced manually.
///
/// Cloning shares the instant, so a scheduler under test and the test body
/// observe the same time.
#[derive(Debug, Clone)]
pub struct FixedClock {
    instant: Arc<Mutex<Timestamp>>,
}

impl FixedClock {
    /// Creates a clock pinned at the given instant.
    pub fn at(instant: Timestamp) -> Self {
        Self {
            instant: Arc::new(Mutex::new(instant)),
        }
    }

    /// Re-pins the clock.
    pub fn set(&self, instant: Timestamp) {
        *self.instant.lock().expect("clock mutex poisoned") = instant;
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut instant = self.instant.lock().expect("clock mutex poisoned");
        *instant = instant.plus(by);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.instant.lock().expect("clock mutex poisoned")
    }
}
