//! Configuration types shared across the engine and its middleware.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;

/// Shortest TTL any cache entry may get.
pub const TTL_FLOOR: Duration = Duration::from_secs(5 * 60);
/// Longest TTL any cache entry may get.
pub const TTL_CEILING: Duration = Duration::from_secs(60 * 60);

/// Bounds and sizing of the adaptive-TTL response cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// TTL before reliability/freshness/status multipliers are applied.
    pub base_ttl: Duration,
    /// Floor applied after the multipliers.
    pub min_ttl: Duration,
    /// Ceiling applied after the multipliers.
    pub max_ttl: Duration,
    /// Entry count at which least-recently-accessed entries are evicted.
    pub max_entries: usize,
    /// Fraction of entries evicted when the cache is full.
    pub eviction_fraction: f64,
    /// Period of the background expiry sweep.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            base_ttl: Duration::from_secs(15 * 60),
            min_ttl: Duration::from_secs(5 * 60),
            max_ttl: Duration::from_secs(60 * 60),
            max_entries: 1000,
            eviction_fraction: 0.10,
            sweep_interval: Duration::from_secs(5 * 60),
        }
    }
}

impl CacheConfig {
    /// TTL bounds actually applied, kept ordered and within
    /// [`TTL_FLOOR`]..=[`TTL_CEILING`] whatever was configured.
    #[must_use]
    pub fn ttl_bounds(&self) -> (Duration, Duration) {
        let min = self.min_ttl.clamp(TTL_FLOOR, TTL_CEILING);
        let max = self.max_ttl.clamp(min, TTL_CEILING);
        (min, max)
    }

    /// Check the TTL bounds.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `min_ttl` or `max_ttl` falls outside
    /// [`TTL_FLOOR`]..=[`TTL_CEILING`], or when `min_ttl > max_ttl`.
    pub fn validate(&self) -> Result<(), TrackingError> {
        let in_range = |d: Duration| (TTL_FLOOR..=TTL_CEILING).contains(&d);
        if !in_range(self.min_ttl) || !in_range(self.max_ttl) {
            return Err(TrackingError::InvalidArg(format!(
                "cache TTL bounds must lie within {}..={} seconds",
                TTL_FLOOR.as_secs(),
                TTL_CEILING.as_secs()
            )));
        }
        if self.min_ttl > self.max_ttl {
            return Err(TrackingError::InvalidArg(
                "cache min_ttl exceeds max_ttl".into(),
            ));
        }
        Ok(())
    }
}

/// Circuit breaker thresholds and timers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive non-rate-limit failures that open the circuit.
    pub failure_threshold: u32,
    /// Cooldown after the first opening. Values below 30s are raised to 30s.
    pub base_cooldown: Duration,
    /// Upper bound for the doubled cooldown after failed trials.
    pub max_cooldown: Duration,
    /// Back-off applied when a provider reports a rate limit without a retry hint.
    pub rate_limit_backoff: Duration,
    /// Random jitter percentage [0, 100] added to each cooldown.
    pub jitter_percent: u8,
}

impl CircuitBreakerConfig {
    /// Smallest cooldown the breaker will ever use.
    pub const MIN_COOLDOWN: Duration = Duration::from_secs(30);

    /// Base cooldown with the 30s floor applied.
    #[must_use]
    pub fn effective_base_cooldown(&self) -> Duration {
        self.base_cooldown.max(Self::MIN_COOLDOWN)
    }
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            base_cooldown: Duration::from_secs(30),
            max_cooldown: Duration::from_secs(10 * 60),
            rate_limit_backoff: Duration::from_secs(60),
            jitter_percent: 0,
        }
    }
}

/// Batching of non-urgent lookups.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Queue length that triggers an immediate flush.
    pub batch_size: usize,
    /// Time after the first enqueue at which a queue is flushed regardless of size.
    pub batch_timeout: Duration,
    /// Maximum lookups in flight while a batch group is dispatched.
    pub max_concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_timeout: Duration::from_secs(2),
            max_concurrency: 5,
        }
    }
}

/// Exponential backoff between retries of a transient provider failure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    /// Minimum backoff delay in milliseconds.
    pub min_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
    /// Exponential factor to increase delay after each failure (>= 1).
    pub factor: u32,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            min_backoff_ms: 250,
            max_backoff_ms: 5_000,
            factor: 2,
            jitter_percent: 20,
        }
    }
}

/// Thresholds used by the routing engine and the fetch loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// A success from a provider above this reliability always stops the fetch loop.
    pub early_stop_reliability: f64,
    /// Window over which recent failures are counted.
    pub recent_failure_window: Duration,
    /// Recent failures at which a provider is moved to the tail of the routing order.
    pub recent_failure_threshold: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            early_stop_reliability: 0.90,
            recent_failure_window: Duration::from_secs(5 * 60),
            recent_failure_threshold: 3,
        }
    }
}

/// Global configuration for the `Tidewatch` engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Response cache sizing and TTL bounds.
    pub cache: CacheConfig,
    /// Circuit breaker thresholds.
    pub circuit_breaker: CircuitBreakerConfig,
    /// Batching of non-urgent lookups.
    pub batch: BatchConfig,
    /// Backoff between retries of transient failures.
    pub backoff: BackoffConfig,
    /// Routing thresholds.
    pub routing: RoutingConfig,
}
