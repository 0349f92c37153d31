//! Mutable per-provider health: admission control and call accounting.
//!
//! Every provider gets its own locks. The breaker and counters share one lock; the
//! rate window has another, always taken second.

use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tidewatch_core::Clock;
use tidewatch_types::{
    CircuitBreakerConfig, CircuitState, CircuitStatus, CostTier, ProviderDescriptor,
    ProviderStats, RoutingConfig, TrackingError,
};

use crate::circuit::{CircuitBreaker, Refusal};
use crate::rate_limit::RateWindow;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[derive(Debug)]
struct HealthState {
    breaker: CircuitBreaker,
    recent_failures: VecDeque<Instant>,
    attempts: u64,
    successes: u64,
    failures: u64,
    rate_limited: u64,
}

#[derive(Debug)]
struct ProviderHealth {
    cost_tier: CostTier,
    reliability: f64,
    state: Mutex<HealthState>,
    window: Mutex<RateWindow>,
}

/// Health of every registered provider.
#[derive(Debug)]
pub struct HealthBook {
    providers: BTreeMap<String, ProviderHealth>,
    routing: RoutingConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
}

impl HealthBook {
    /// Track `descriptors`. `seed` makes breaker jitter reproducible.
    pub fn new<'a>(
        descriptors: impl IntoIterator<Item = &'a ProviderDescriptor>,
        breaker: CircuitBreakerConfig,
        routing: RoutingConfig,
        clock: Arc<dyn Clock>,
        seed: Option<u64>,
    ) -> Self {
        let providers = descriptors
            .into_iter()
            .map(|d| {
                let health = ProviderHealth {
                    cost_tier: d.cost_tier,
                    reliability: d.reliability,
                    state: Mutex::new(HealthState {
                        breaker: CircuitBreaker::new(breaker),
                        recent_failures: VecDeque::new(),
                        attempts: 0,
                        successes: 0,
                        failures: 0,
                        rate_limited: 0,
                    }),
                    window: Mutex::new(RateWindow::new(d.rate_limit)),
                };
                (d.name.clone(), health)
            })
            .collect();
        let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self {
            providers,
            routing,
            clock,
            rng: Mutex::new(rng),
        }
    }

    fn entry(&self, provider: &str) -> Result<&ProviderHealth, TrackingError> {
        self.providers
            .get(provider)
            .ok_or_else(|| TrackingError::InvalidArg(format!("unknown provider: {provider}")))
    }

    /// Admit one call to `provider`, or refuse it.
    ///
    /// On admission the call is counted against the rate window and, for a half-open
    /// circuit, claims the trial slot. Keep the returned [`Admission`] alive until the
    /// outcome has been recorded: dropping it earlier gives the trial slot back.
    ///
    /// # Errors
    /// Returns `TrackingError::RateLimit` with a retry hint when the circuit is open,
    /// a trial is already running, the provider asked us to back off, or the
    /// rate window is full. Returns `InvalidArg` for an unknown provider.
    pub fn check_admission<'a>(&'a self, provider: &'a str) -> Result<Admission<'a>, TrackingError> {
        let entry = self.entry(provider)?;
        let now = self.clock.now();
        let mut st = lock(&entry.state);

        let denial = match st.breaker.check(now) {
            Err((reason, wait)) => Some((reason_label(reason), wait)),
            Ok(()) => lock(&entry.window)
                .try_acquire(now)
                .err()
                .map(|wait| ("rate window full", Some(wait))),
        };

        if let Some((reason, wait)) = denial {
            st.rate_limited += 1;
            #[cfg(feature = "tracing")]
            tracing::debug!(
                provider = provider,
                reason = reason,
                retry_in_ms = wait.map(millis),
                "admission denied"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = reason;
            return Err(TrackingError::rate_limit(provider, wait));
        }

        let trial = st.breaker.begin();
        st.attempts += 1;
        Ok(Admission {
            entry,
            provider,
            trial,
        })
    }

    /// Record a usable answer from `provider`.
    pub fn record_success(&self, provider: &str) {
        let Ok(entry) = self.entry(provider) else {
            return;
        };
        let mut st = lock(&entry.state);
        st.successes += 1;
        if st.breaker.record_success() {
            #[cfg(feature = "tracing")]
            tracing::info!(
                provider = provider,
                "circuit closed after successful trial"
            );
        }
    }

    /// Record a failed call to `provider`.
    ///
    /// Rate-limit errors back the provider off without counting as a fault. Every
    /// other error, including ones outside the provider taxonomy, increments the
    /// consecutive and rolling failure counts.
    pub fn record_failure(&self, provider: &str, err: &TrackingError) {
        let Ok(entry) = self.entry(provider) else {
            return;
        };
        let now = self.clock.now();
        let mut st = lock(&entry.state);

        if let TrackingError::RateLimit { .. } = err {
            st.rate_limited += 1;
            st.breaker.record_rate_limited(now, err.retry_after());
            return;
        }

        st.failures += 1;
        st.recent_failures.push_back(now);
        prune_recent(&mut st.recent_failures, now, self.routing.recent_failure_window);
        let opened = {
            let mut rng = lock(&self.rng);
            st.breaker.record_failure(now, &mut *rng)
        };
        if opened {
            #[cfg(feature = "tracing")]
            tracing::warn!(
                provider = provider,
                consecutive_failures = st.breaker.consecutive_failures(),
                cooldown_ms = millis(st.breaker.cooldown()),
                "circuit opened"
            );
        }
    }

    /// Whether `provider` failed often enough recently, or has an open circuit,
    /// to be tried last.
    pub fn is_recently_failing(&self, provider: &str) -> bool {
        let Ok(entry) = self.entry(provider) else {
            return false;
        };
        let now = self.clock.now();
        let mut st = lock(&entry.state);
        prune_recent(&mut st.recent_failures, now, self.routing.recent_failure_window);
        let recent = st.recent_failures.len();
        recent >= self.routing.recent_failure_threshold.max(1) as usize
            || st.breaker.state(now) == CircuitState::Open
    }

    /// Names of every provider [`is_recently_failing`](Self::is_recently_failing) flags.
    pub fn recently_failing(&self) -> Vec<String> {
        self.providers
            .keys()
            .filter(|name| self.is_recently_failing(name))
            .cloned()
            .collect()
    }

    /// Breaker state of `provider`.
    pub fn circuit_state(&self, provider: &str) -> Option<CircuitState> {
        let entry = self.entry(provider).ok()?;
        let now = self.clock.now();
        Some(lock(&entry.state).breaker.state(now))
    }

    /// Call accounting for every provider, by name.
    pub fn stats(&self) -> Vec<ProviderStats> {
        let now = self.clock.now();
        self.providers
            .iter()
            .map(|(name, entry)| {
                let mut st = lock(&entry.state);
                prune_recent(&mut st.recent_failures, now, self.routing.recent_failure_window);
                let circuit = st.breaker.state(now);
                let calls_this_minute = lock(&entry.window).calls_this_minute(now);
                let completed = st.successes + st.failures;
                #[allow(clippy::cast_precision_loss)]
                let observed_success_rate =
                    (completed > 0).then(|| st.successes as f64 / completed as f64);
                ProviderStats {
                    provider: name.clone(),
                    cost_tier: entry.cost_tier,
                    reliability: entry.reliability,
                    attempts: st.attempts,
                    successes: st.successes,
                    failures: st.failures,
                    rate_limited: st.rate_limited,
                    recent_failures: u32::try_from(st.recent_failures.len()).unwrap_or(u32::MAX),
                    calls_this_minute,
                    observed_success_rate,
                    circuit,
                }
            })
            .collect()
    }

    /// Breaker snapshot for every provider, by name.
    pub fn circuit_status(&self) -> Vec<CircuitStatus> {
        let now = self.clock.now();
        self.providers
            .iter()
            .map(|(name, entry)| {
                let mut st = lock(&entry.state);
                let state = st.breaker.state(now);
                CircuitStatus {
                    provider: name.clone(),
                    state,
                    consecutive_failures: st.breaker.consecutive_failures(),
                    cooldown_ms: millis(st.breaker.cooldown()),
                    retry_in_ms: st.breaker.retry_in(now).map(millis),
                    since_last_failure_ms: st
                        .breaker
                        .last_failure()
                        .map(|t| millis(now.saturating_duration_since(t))),
                }
            })
            .collect()
    }

    /// Close `provider`'s circuit and forget its recent failures and back-off.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an unknown provider.
    pub fn reset(&self, provider: &str) -> Result<(), TrackingError> {
        let entry = self.entry(provider)?;
        let mut st = lock(&entry.state);
        st.breaker.reset();
        st.recent_failures.clear();
        #[cfg(feature = "tracing")]
        tracing::info!(
            provider = provider,
            "circuit reset"
        );
        Ok(())
    }
}

/// A granted call slot, returned by [`HealthBook::check_admission`].
///
/// If the call claimed a half-open trial and is dropped before a success or
/// failure was recorded (a cancelled lookup, say), the slot is released so the
/// next call can run the trial.
#[must_use = "dropping an admission releases a half-open trial slot"]
#[derive(Debug)]
pub struct Admission<'a> {
    entry: &'a ProviderHealth,
    provider: &'a str,
    trial: bool,
}

impl Admission<'_> {
    /// Whether this call is the half-open trial.
    pub const fn is_trial(&self) -> bool {
        self.trial
    }
}

impl Drop for Admission<'_> {
    fn drop(&mut self) {
        if !self.trial {
            return;
        }
        if lock(&self.entry.state).breaker.abandon_trial() {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                provider = self.provider,
                "half-open trial abandoned without a verdict"
            );
        }
        #[cfg(not(feature = "tracing"))]
        let _ = self.provider;
    }
}

fn prune_recent(recent: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while recent
        .front()
        .is_some_and(|&t| now.saturating_duration_since(t) >= window)
    {
        recent.pop_front();
    }
}

const fn reason_label(r: Refusal) -> &'static str {
    match r {
        Refusal::Open => "circuit open",
        Refusal::TrialInFlight => "half-open trial in flight",
        Refusal::BackingOff => "provider back-off",
    }
}
