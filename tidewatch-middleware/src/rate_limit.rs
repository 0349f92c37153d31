//! Per-provider call ceilings.
//!
//! The per-minute ceiling is a sliding log of call instants, so at most
//! `per_minute` calls land in any rolling 60 second span. The optional per-hour
//! ceiling uses fixed one-hour windows aligned to the first call.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use tidewatch_types::RateLimit;

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);

/// Call accounting for one provider.
#[derive(Debug, Clone)]
pub struct RateWindow {
    limit: RateLimit,
    recent: VecDeque<Instant>,
    hour_start: Option<Instant>,
    calls_in_hour: u32,
}

impl RateWindow {
    /// Empty window enforcing `limit`.
    #[must_use]
    pub fn new(limit: RateLimit) -> Self {
        Self {
            limit,
            recent: VecDeque::with_capacity(limit.per_minute as usize),
            hour_start: None,
            calls_in_hour: 0,
        }
    }

    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.recent.front() {
            if now.saturating_duration_since(oldest) >= MINUTE {
                self.recent.pop_front();
            } else {
                break;
            }
        }

        if let Some(start) = self.hour_start {
            let elapsed = now.saturating_duration_since(start);
            if elapsed >= HOUR {
                self.calls_in_hour = 0;
                // Keep hour windows aligned even after idle gaps.
                let windows_passed = elapsed.as_nanos() / HOUR.as_nanos();
                let offset = Duration::from_nanos(
                    (windows_passed * HOUR.as_nanos())
                        .try_into()
                        .unwrap_or(u64::MAX),
                );
                self.hour_start = Some(start + offset);
            }
        }
    }

    /// Check whether a call may be made now without recording it.
    ///
    /// # Errors
    /// Returns the time until the next call would be admitted.
    pub fn check(&mut self, now: Instant) -> Result<(), Duration> {
        self.prune(now);

        if self.recent.len() >= self.limit.per_minute as usize {
            let wait = self.recent.front().map_or(MINUTE, |&oldest| {
                MINUTE.saturating_sub(now.saturating_duration_since(oldest))
            });
            return Err(wait);
        }

        if let Some(per_hour) = self.limit.per_hour
            && self.calls_in_hour >= per_hour
        {
            let elapsed = self
                .hour_start
                .map_or(Duration::ZERO, |s| now.saturating_duration_since(s));
            return Err(HOUR.saturating_sub(elapsed));
        }

        Ok(())
    }

    /// Record a call made at `now`.
    pub fn record(&mut self, now: Instant) {
        self.recent.push_back(now);
        if self.hour_start.is_none() {
            self.hour_start = Some(now);
        }
        self.calls_in_hour = self.calls_in_hour.saturating_add(1);
    }

    /// Check and record in one step.
    ///
    /// # Errors
    /// Returns the time until the next call would be admitted; nothing is recorded.
    pub fn try_acquire(&mut self, now: Instant) -> Result<(), Duration> {
        self.check(now)?;
        self.record(now);
        Ok(())
    }

    /// Admit a call if the ceilings allow it.
    pub fn admit(&mut self, now: Instant) -> bool {
        self.try_acquire(now).is_ok()
    }

    /// Calls made in the last 60 seconds.
    pub fn calls_this_minute(&mut self, now: Instant) -> u32 {
        self.prune(now);
        u32::try_from(self.recent.len()).unwrap_or(u32::MAX)
    }
}
