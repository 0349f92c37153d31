//! Tidewatch-specific error taxonomy, provider catalog entries, configuration and report types.
#![warn(missing_docs)]

mod config;
mod error;
mod kinds;
mod provider;
mod reports;

pub use config::{
    BackoffConfig, BatchConfig, CacheConfig, CircuitBreakerConfig, EngineConfig, RoutingConfig,
    TTL_CEILING, TTL_FLOOR,
};
pub use error::{ErrorCategory, TrackingError};
pub use kinds::{CallerTier, CostTier, FallbackStrategy, Priority, TrackingKind, TrackingKinds};
pub use provider::{ProviderDescriptor, RateLimit};
pub use reports::{CacheStats, CircuitState, CircuitStatus, ProviderStats, RoutingStats};
