//! Per-provider circuit breaker.
//!
//! - **Closed**: calls flow; consecutive faults are counted.
//! - **Open**: calls are blocked until the cooldown elapses.
//! - **HalfOpen**: exactly one trial call is admitted. Success closes the circuit,
//!   failure reopens it with the cooldown doubled up to the configured cap.
//!
//! A provider-reported rate limit never counts as a fault. It puts the provider
//! into a separate back-off window instead.

use std::time::{Duration, Instant};

use rand::Rng;
use tidewatch_types::{CircuitBreakerConfig, CircuitState};

use crate::backoff::jitter_wait;

const MIN_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open { until: Instant },
    HalfOpen { trial_in_flight: bool },
}

/// Why a call was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The circuit is open.
    Open,
    /// The circuit is half-open and its trial call is already running.
    TrialInFlight,
    /// The provider asked us to back off.
    BackingOff,
}

/// Circuit breaker state machine for a single provider.
///
/// Time is always passed in so the caller decides which clock drives it.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    state: State,
    consecutive_failures: u32,
    cooldown: Duration,
    last_failure: Option<Instant>,
    backoff_until: Option<Instant>,
}

impl CircuitBreaker {
    /// A closed breaker.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            cooldown: config.effective_base_cooldown(),
            config,
            state: State::Closed,
            consecutive_failures: 0,
            last_failure: None,
            backoff_until: None,
        }
    }

    fn poll(&mut self, now: Instant) {
        if let State::Open { until } = self.state
            && now >= until
        {
            self.state = State::HalfOpen {
                trial_in_flight: false,
            };
        }
        if self.backoff_until.is_some_and(|t| now >= t) {
            self.backoff_until = None;
        }
    }

    /// Public state after applying any elapsed cooldown.
    pub fn state(&mut self, now: Instant) -> CircuitState {
        self.poll(now);
        match self.state {
            State::Closed => CircuitState::Closed,
            State::Open { .. } => CircuitState::Open,
            State::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Whether a call may be made now. Does not claim the half-open trial slot.
    ///
    /// # Errors
    /// Returns the refusal reason and, when known, how long until a call may pass.
    pub fn check(&mut self, now: Instant) -> Result<(), (Refusal, Option<Duration>)> {
        self.poll(now);
        match self.state {
            State::Open { until } => {
                return Err((Refusal::Open, Some(until.saturating_duration_since(now))));
            }
            State::HalfOpen {
                trial_in_flight: true,
            } => return Err((Refusal::TrialInFlight, None)),
            _ => {}
        }
        if let Some(until) = self.backoff_until {
            return Err((
                Refusal::BackingOff,
                Some(until.saturating_duration_since(now)),
            ));
        }
        Ok(())
    }

    /// Mark a call as started. In half-open state this claims the single trial slot
    /// and returns `true`.
    pub fn begin(&mut self) -> bool {
        if let State::HalfOpen { .. } = self.state {
            self.state = State::HalfOpen {
                trial_in_flight: true,
            };
            return true;
        }
        false
    }

    /// Give back a claimed trial slot that never produced a verdict.
    ///
    /// Returns `true` if a running trial was released.
    pub fn abandon_trial(&mut self) -> bool {
        if let State::HalfOpen {
            trial_in_flight: true,
        } = self.state
        {
            self.state = State::HalfOpen {
                trial_in_flight: false,
            };
            return true;
        }
        false
    }

    /// A call succeeded. Returns `true` if this closed a half-open circuit.
    pub fn record_success(&mut self) -> bool {
        self.consecutive_failures = 0;
        if let State::HalfOpen { .. } = self.state {
            self.state = State::Closed;
            self.cooldown = self.config.effective_base_cooldown();
            return true;
        }
        false
    }

    /// A call faulted. Returns `true` if this opened the circuit.
    pub fn record_failure<R: Rng>(&mut self, now: Instant, rng: &mut R) -> bool {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_failure = Some(now);
        match self.state {
            State::HalfOpen { .. } => {
                self.cooldown = self
                    .cooldown
                    .saturating_mul(2)
                    .min(self.config.max_cooldown.max(self.config.effective_base_cooldown()));
                self.open(now, rng);
                true
            }
            State::Closed if self.consecutive_failures >= self.config.failure_threshold.max(1) => {
                self.open(now, rng);
                true
            }
            _ => false,
        }
    }

    /// The provider reported a rate limit.
    ///
    /// Backs off for `max(retry_after, 1s)`, or the configured default when no hint
    /// was given. A half-open trial slot is released without a verdict.
    pub fn record_rate_limited(&mut self, now: Instant, retry_after: Option<Duration>) {
        let wait = retry_after
            .unwrap_or(self.config.rate_limit_backoff)
            .max(MIN_RATE_LIMIT_BACKOFF);
        let until = now + wait;
        self.backoff_until = Some(self.backoff_until.map_or(until, |t| t.max(until)));
        if let State::HalfOpen { .. } = self.state {
            self.state = State::HalfOpen {
                trial_in_flight: false,
            };
        }
    }

    fn open<R: Rng>(&mut self, now: Instant, rng: &mut R) {
        let base_ms = u64::try_from(self.cooldown.as_millis()).unwrap_or(u64::MAX);
        let ms = if self.config.jitter_percent == 0 {
            base_ms
        } else {
            jitter_wait(base_ms, u32::from(self.config.jitter_percent), rng)
        };
        self.state = State::Open {
            until: now + Duration::from_millis(ms),
        };
    }

    /// Return to a fresh closed state.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }

    /// Consecutive faults since the last success.
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Cooldown the next opening would use.
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// When the most recent fault happened.
    #[must_use]
    pub const fn last_failure(&self) -> Option<Instant> {
        self.last_failure
    }

    /// Time until a call would pass, if currently blocked.
    pub fn retry_in(&mut self, now: Instant) -> Option<Duration> {
        match self.check(now) {
            Ok(()) => None,
            Err((_, wait)) => wait.or(Some(Duration::ZERO)),
        }
    }
}
