//! Time sources.
//!
//! Rate-limit windows, circuit cooldowns and cache ages all read the clock through
//! [`Clock`] so tests can move time deterministically.

use core::fmt;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// A source of monotonic and wall-clock time.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Monotonic now.
    fn now(&self) -> Instant;
    /// Wall-clock now.
    fn utc_now(&self) -> DateTime<Utc>;
}

/// Real time.
///
/// Monotonic time is read through `tokio::time` so that a paused test runtime
/// also pauses this clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    base_utc: DateTime<Utc>,
    offset: Mutex<Duration>,
}

impl ManualClock {
    /// Start at the current instant and the given wall-clock time.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            base: Instant::now(),
            base_utc: start,
            offset: Mutex::new(Duration::ZERO),
        }
    }

    /// Move time forward.
    pub fn advance(&self, by: Duration) {
        let mut off = self.offset.lock().unwrap_or_else(PoisonError::into_inner);
        *off += by;
    }

    fn offset(&self) -> Duration {
        *self.offset.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + self.offset()
    }

    fn utc_now(&self) -> DateTime<Utc> {
        let off = chrono::Duration::from_std(self.offset()).unwrap_or(chrono::TimeDelta::MAX);
        self.base_utc + off
    }
}
