//! Time sources for the executor
//!
//! The executor reads time for record timestamps, the timeout check and run
//! duration. [`SystemClock`] is wall-clock time. [`MockClock`] holds a
//! virtual time that only moves when told to, optionally advancing by a
//! fixed amount after every step, which makes timeouts reproducible:
//!
//! ```
//! use std::time::Duration;
//! use step_engine::engine::clock::{Clock, MockClock};
//!
//! let clock = MockClock::new().with_step_duration(Duration::from_secs(3));
//! let start = clock.now();
//! clock.step_finished();
//! assert_eq!((clock.now() - start).num_seconds(), 3);
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Called by the executor once after each step finishes
    fn step_finished(&self) {}
}

/// Real wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Virtual clock shared between the executor and a test
#[derive(Debug, Clone)]
pub struct MockClock {
    inner: Arc<Mutex<ClockState>>,
}

#[derive(Debug)]
struct ClockState {
    time: DateTime<Utc>,
    /// Amount added after each step, if auto-advance is on
    step_duration: Option<Duration>,
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClock {
    /// Frozen clock starting at the current real time
    pub fn new() -> Self {
        Self::at(Utc::now())
    }

    /// Frozen clock starting at `time`
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClockState {
                time,
                step_duration: None,
            })),
        }
    }

    /// Advance by `duration` after every step
    pub fn with_step_duration(self, duration: Duration) -> Self {
        self.state().step_duration = Some(duration);
        self
    }

    pub fn set(&self, time: DateTime<Utc>) {
        self.state().time = time;
    }

    pub fn forward(&self, duration: Duration) {
        if let Ok(delta) = chrono::Duration::from_std(duration) {
            self.state().time += delta;
        }
    }

    fn state(&self) -> MutexGuard<'_, ClockState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for MockClock {
    fn now(&self) -> DateTime<Utc> {
        self.state().time
    }

    fn step_finished(&self) {
        let mut state = self.state();
        if let Some(delta) = state
            .step_duration
            .and_then(|d| chrono::Duration::from_std(d).ok())
        {
            state.time += delta;
        }
    }
}

/// Elapsed time between two instants, zero if `end` precedes `start`
pub fn elapsed(start: DateTime<Utc>, end: DateTime<Utc>) -> Duration {
    (end - start).to_std().unwrap_or(Duration::ZERO)
}
