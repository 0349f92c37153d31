//! Tidewatch tracks shipments across multiple tracking providers.
//!
//! Overview
//! - Routes each lookup to providers that implement the `tidewatch_core` adapter trait.
//! - Orders providers by cost and reliability, demoting those that failed recently.
//! - Guards every call with per-provider rate limits and circuit breakers.
//! - Caches answers with a TTL that adapts to reliability, freshness and status.
//! - Batches non-urgent lookups and merges multi-provider answers into one record.
//!
//! Key behaviors and trade-offs
//! - Fallback strategy:
//!   - `free_first` (free callers or cost optimisation): stop at the first success;
//!     cheapest, may settle for less reliable data.
//!   - `reliability_first` (premium and enterprise callers): stop only at a success
//!     above 0.85 reliability; more calls, better data.
//!   - `paid_first` (everyone else): stop at a success above 0.75.
//!   - Any success above 0.90 stops the loop regardless of strategy.
//! - Failures: provider errors never escape the loop. When nothing usable comes
//!   back the caller gets a single `Degraded` error, transient when a rate limit or
//!   network failure was seen and permanent otherwise.
//! - Rate limits are expected behavior: they back a provider off but never open
//!   its circuit.
//! - Batching trades up to `batch.batch_timeout` of latency for fewer, grouped
//!   provider calls; `Priority::High` skips it.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use tidewatch::{Tidewatch, TrackOptions};
//! use tidewatch_mock::MockProvider;
//!
//! let engine = Tidewatch::builder()
//!     .with_provider(Arc::new(MockProvider::free("public-ais", 0.72)))
//!     .build()?;
//!
//! let merged = engine.track("MSCU1234565", None).await?;
//! let raw = engine
//!     .track_with_optimization("MAEU123456789", None, TrackOptions::urgent())
//!     .await?;
//! ```
//!
//! See `tidewatch/examples/` for a runnable demonstration.
#![warn(missing_docs)]

mod admin;
mod batch;
pub(crate) mod core;
mod registry;
mod router;

pub use core::{Tidewatch, TidewatchBuilder, TrackOptions, TrackRequest, normalize};
pub use registry::ProviderRegistry;
pub use router::util::degrade;
pub use router::{RoutingContext, RoutingDecision, RoutingEngine};

pub use tidewatch_middleware::{CacheKey, HealthBook, ResponseCache};

// Re-export core types for convenience
pub use tidewatch_core::{
    AdapterFault, BackoffConfig, BatchConfig, CacheConfig, CacheStats, CallerTier,
    CircuitBreakerConfig, CircuitState, CircuitStatus, Clock, CostTier, EngineConfig,
    ErrorCategory, FallbackStrategy, ManualClock, MergedShipment, Priority, ProviderDescriptor,
    ProviderResponse, ProviderStats, RateLimit, RawOutcome, RawResult, ResultStatus,
    RoutingConfig, RoutingStats, ShipmentPayload, ShipmentStatus, SystemClock, TimelineEvent,
    TrackingError, TrackingKind, TrackingKinds, TrackingProvider, classify_fault,
    prioritize_data_sources,
};
