//! Static provider catalog entries.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::TrackingError;
use crate::kinds::{CostTier, TrackingKinds};

/// Request ceilings advertised by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Maximum calls in any 60-second window.
    pub per_minute: u32,
    /// Maximum calls per hour; `None` means no hourly ceiling.
    pub per_hour: Option<u32>,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self {
            per_minute: 60,
            per_hour: None,
        }
    }
}

/// Immutable catalog entry describing one tracking provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    /// Stable identifier used in routing decisions, stats and errors.
    pub name: String,
    /// Tracking-number kinds the provider can serve.
    pub kinds: TrackingKinds,
    /// Pricing tier.
    pub cost_tier: CostTier,
    /// Static reliability score in `[0, 1]`.
    pub reliability: f64,
    /// Request ceilings.
    #[serde(default)]
    pub rate_limit: RateLimit,
    /// Per-call timeout budget.
    pub timeout: Duration,
    /// Extra attempts allowed after a transient failure.
    #[serde(default)]
    pub retries: u32,
    /// Whether the provider aggregates other carriers' data.
    #[serde(default)]
    pub is_aggregator: bool,
}

impl ProviderDescriptor {
    /// Create a descriptor serving every kind, with default limits, a 10s timeout and no retries.
    pub fn new(name: impl Into<String>, cost_tier: CostTier, reliability: f64) -> Self {
        Self {
            name: name.into(),
            kinds: TrackingKinds::all(),
            cost_tier,
            reliability,
            rate_limit: RateLimit::default(),
            timeout: Duration::from_secs(10),
            retries: 0,
            is_aggregator: false,
        }
    }

    /// Restrict the kinds this provider serves.
    #[must_use]
    pub const fn with_kinds(mut self, kinds: TrackingKinds) -> Self {
        self.kinds = kinds;
        self
    }

    /// Set the request ceilings.
    #[must_use]
    pub const fn with_rate_limit(mut self, per_minute: u32, per_hour: Option<u32>) -> Self {
        self.rate_limit = RateLimit {
            per_minute,
            per_hour,
        };
        self
    }

    /// Set the per-call timeout budget.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Mark the provider as an aggregator.
    #[must_use]
    pub const fn aggregator(mut self) -> Self {
        self.is_aggregator = true;
        self
    }

    /// Check that the descriptor is internally consistent.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an empty name, a reliability outside `[0, 1]`,
    /// a zero per-minute ceiling, an empty kind set or a zero timeout.
    pub fn validate(&self) -> Result<(), TrackingError> {
        if self.name.trim().is_empty() {
            return Err(TrackingError::InvalidArg(
                "provider name must not be empty".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.reliability) {
            return Err(TrackingError::InvalidArg(format!(
                "provider '{}' reliability {} is outside [0, 1]",
                self.name, self.reliability
            )));
        }
        if self.rate_limit.per_minute == 0 {
            return Err(TrackingError::InvalidArg(format!(
                "provider '{}' per-minute ceiling must be positive",
                self.name
            )));
        }
        if self.kinds.is_empty() {
            return Err(TrackingError::InvalidArg(format!(
                "provider '{}' serves no tracking kinds",
                self.name
            )));
        }
        if self.timeout.is_zero() {
            return Err(TrackingError::InvalidArg(format!(
                "provider '{}' timeout must be positive",
                self.name
            )));
        }
        Ok(())
    }
}
