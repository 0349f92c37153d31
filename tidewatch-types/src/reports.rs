//! Read-only snapshots returned by the administrative surface.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::kinds::CostTier;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Calls flow normally.
    Closed,
    /// Calls are blocked until the cooldown elapses.
    Open,
    /// A single trial call is allowed.
    HalfOpen,
}

/// Breaker snapshot for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CircuitStatus {
    /// Provider name.
    pub provider: String,
    /// Current state.
    pub state: CircuitState,
    /// Consecutive non-rate-limit failures.
    pub consecutive_failures: u32,
    /// Cooldown the next opening would use, in milliseconds.
    pub cooldown_ms: u64,
    /// Milliseconds until the provider is admitted again, if currently blocked.
    pub retry_in_ms: Option<u64>,
    /// Milliseconds since the most recent fault, if any.
    pub since_last_failure_ms: Option<u64>,
}

/// Call accounting for one provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    /// Provider name.
    pub provider: String,
    /// Pricing tier.
    pub cost_tier: CostTier,
    /// Static reliability from the catalog.
    pub reliability: f64,
    /// Calls that reached the adapter.
    pub attempts: u64,
    /// Successful or partial answers.
    pub successes: u64,
    /// Faults (rate limits excluded).
    pub failures: u64,
    /// Rate-limit answers plus calls denied by admission control.
    pub rate_limited: u64,
    /// Faults within the recent-failure window.
    pub recent_failures: u32,
    /// Calls made in the current minute window.
    pub calls_this_minute: u32,
    /// `successes / (successes + failures)`, if any call completed.
    pub observed_success_rate: Option<f64>,
    /// Breaker state.
    pub circuit: CircuitState,
}

/// Cache counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Live entries.
    pub entries: usize,
    /// Configured maximum.
    pub capacity: usize,
    /// Lookups answered from cache.
    pub hits: u64,
    /// Lookups that missed (absent or expired).
    pub misses: u64,
    /// Entries removed for capacity.
    pub evictions: u64,
    /// Entries removed because their TTL elapsed.
    pub expirations: u64,
    /// `hits / (hits + misses)`, or 0 when nothing was looked up.
    pub hit_rate: f64,
}

/// Routing engine counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStats {
    /// Routing decisions made.
    pub decisions: u64,
    /// Decisions per fallback strategy label.
    pub by_strategy: BTreeMap<String, u64>,
    /// How often each provider was ranked first.
    pub top_choice: BTreeMap<String, u64>,
    /// Providers moved to the tail because of recent failures, summed over decisions.
    pub deprioritized: u64,
    /// Decisions that found no eligible provider.
    pub empty: u64,
}
