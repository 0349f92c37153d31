// Re-export helpers so tests can `use crate::helpers::*;`
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tidewatch::{
    CostTier, EngineConfig, ManualClock, ProviderDescriptor, ShipmentPayload, ShipmentStatus,
    Tidewatch, TimelineEvent, TrackingProvider,
};
use tidewatch_mock::{ScriptedController, ScriptedProvider};

/// Common tracking numbers used across tests.
pub const CONTAINER: &str = "MSCU1234565";
pub const BILL: &str = "MAEU123456789";
pub const BOOKING: &str = "BK42";

/// Construct a UTC timestamp from seconds since the epoch.
pub fn ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).expect("valid timestamp")
}

/// A scripted provider with the given catalog entry.
pub fn scripted(
    name: &str,
    tier: CostTier,
    reliability: f64,
) -> (Arc<dyn TrackingProvider>, ScriptedController) {
    ScriptedProvider::new_with_controller(ProviderDescriptor::new(name, tier, reliability))
}

/// A scripted provider with a fully custom descriptor.
pub fn scripted_with(desc: ProviderDescriptor) -> (Arc<dyn TrackingProvider>, ScriptedController) {
    ScriptedProvider::new_with_controller(desc)
}

/// In-transit payload with one departure event.
pub fn in_transit(carrier: &str) -> ShipmentPayload {
    ShipmentPayload::new(ShipmentStatus::InTransit)
        .with_carrier(carrier)
        .with_route("CNSHA", "NLRTM")
        .with_event(TimelineEvent::new(ts(1_700_000_000), "Departed", "Shanghai"))
}

/// Engine over `providers` with a manual clock and a fixed seed.
pub fn engine_with_clock(
    providers: Vec<Arc<dyn TrackingProvider>>,
    cfg: EngineConfig,
) -> (Tidewatch, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(ts(1_700_000_000)));
    let mut builder = Tidewatch::builder()
        .config(cfg)
        .clock(clock.clone())
        .rng_seed(42);
    for p in providers {
        builder = builder.with_provider(p);
    }
    (builder.build().expect("engine builds"), clock)
}

/// Engine over `providers` with default configuration and the system clock.
pub fn engine(providers: Vec<Arc<dyn TrackingProvider>>) -> Tidewatch {
    engine_cfg(providers, EngineConfig::default())
}

/// Engine over `providers` with the system clock.
pub fn engine_cfg(providers: Vec<Arc<dyn TrackingProvider>>, cfg: EngineConfig) -> Tidewatch {
    let mut builder = Tidewatch::builder().config(cfg).rng_seed(42);
    for p in providers {
        builder = builder.with_provider(p);
    }
    builder.build().expect("engine builds")
}

/// Zero-jitter, short back-off so retry tests stay quick.
pub fn quick_backoff(mut cfg: EngineConfig) -> EngineConfig {
    cfg.backoff.min_backoff_ms = 10;
    cfg.backoff.max_backoff_ms = 20;
    cfg.backoff.jitter_percent = 0;
    cfg
}

/// Shorthand for a millisecond duration.
pub const fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
