//! tidewatch-core
//!
//! Core types, traits, and utilities shared across the tidewatch workspace.
//!
//! - `types`: shipment payloads, per-provider results, the merged record.
//! - `connector`: the `TrackingProvider` adapter trait.
//! - `classify`: mapping raw adapter faults onto the error taxonomy.
//! - `merge`: combining results from several providers into one record.
//! - `clock`: injectable time sources.
//!
//! Async runtime (Tokio)
//! ---------------------
//! [`SystemClock`] reads monotonic time through `tokio::time`, so a paused Tokio
//! test runtime pauses every time-dependent component built on it.
#![warn(missing_docs)]

/// Fault classification for adapters.
pub mod classify;
/// Injectable clocks.
pub mod clock;
/// The provider adapter trait.
pub mod connector;
/// Result merging.
pub mod merge;
pub mod types;

pub use classify::{AdapterFault, classify_fault};
pub use clock::{Clock, ManualClock, SystemClock};
pub use connector::TrackingProvider;
pub use merge::prioritize_data_sources;
pub use types::*;

pub use tidewatch_types::{
    BackoffConfig, BatchConfig, CacheConfig, CacheStats, CallerTier, CircuitBreakerConfig,
    CircuitState, CircuitStatus, CostTier, EngineConfig, ErrorCategory, FallbackStrategy, Priority,
    ProviderDescriptor, ProviderStats, RateLimit, RoutingConfig, RoutingStats, TrackingError,
    TrackingKind, TrackingKinds,
};
