//! Timestamp utilities
//!
//! The analysis engine never reads the system time directly. Timestamps for
//! `computed_at` and cache expiry come from a [`Clock`] so tests can drive
//! time deterministically.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current UTC timestamp
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock
///
/// Starts at a fixed instant and only moves when [`ManualClock::advance`]
/// or [`ManualClock::set`] is called.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    /// Move the clock forward by `by`
    pub fn advance(&self, by: std::time::Duration) {
        let delta =
            ChronoDuration::from_std(by).unwrap_or_else(|_| ChronoDuration::weeks(52 * 100));
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = current.checked_add_signed(delta).unwrap_or(*current);
    }

    /// Jump to an absolute instant
    pub fn set(&self, at: DateTime<Utc>) {
        let mut current = self.current.lock().unwrap_or_else(|e| e.into_inner());
        *current = at;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().unwrap_or_else(|e| e.into_inner())
    }
}
