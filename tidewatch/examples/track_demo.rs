use std::sync::Arc;
use std::time::Duration;

use tidewatch::{CostTier, ProviderDescriptor, Tidewatch, TrackOptions, TrackingKinds};
use tidewatch_mock::MockProvider;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Log through tracing; override with RUST_LOG=tidewatch=debug.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Register a small catalog of fixture-backed providers.
    let ais = MockProvider::free("public-ais", 0.68);
    let carrier = MockProvider::new(
        ProviderDescriptor::new("carrier-direct", CostTier::Premium, 0.96)
            .with_kinds(TrackingKinds::CONTAINER | TrackingKinds::BILL_OF_LADING)
            .with_rate_limit(30, Some(1_000))
            .with_timeout(Duration::from_secs(5)),
    );
    let aggregator = MockProvider::new(
        ProviderDescriptor::new("port-aggregator", CostTier::Paid, 0.88)
            .aggregator()
            .with_retries(1),
    );
    // No credential: silently left out of the registry.
    let unconfigured =
        MockProvider::new(ProviderDescriptor::new("unconfigured", CostTier::Paid, 0.99))
            .without_credential();

    let tw = Tidewatch::builder()
        .with_provider(Arc::new(ais))
        .with_provider(Arc::new(carrier))
        .with_provider(Arc::new(aggregator))
        .with_provider(Arc::new(unconfigured))
        .build()?;

    // 3. A merged lookup.
    let merged = tw.track("MSCU1234565", None).await?;
    println!("{}", serde_json::to_string_pretty(&merged)?);

    // 4. A few batched lookups, including ones that fail.
    let results = tw
        .track_multiple(
            ["MAEU123456789", "BK20240117", "NOTFOUND1", "RATELIMIT7"],
            TrackOptions::default(),
        )
        .await;
    let mut numbers: Vec<_> = results.keys().cloned().collect();
    numbers.sort();
    for n in numbers {
        match &results[&n] {
            Ok(raw) => println!("{n}: {} provider answer(s)", raw.len()),
            Err(e) => println!("{n}: {e}"),
        }
    }

    // 5. Operator view.
    println!("{}", serde_json::to_string_pretty(&tw.get_provider_stats())?);
    println!(
        "{}",
        serde_json::to_string_pretty(&tw.get_circuit_breaker_status())?
    );
    println!("{}", serde_json::to_string_pretty(&tw.get_cache_stats().await)?);
    println!("{}", serde_json::to_string_pretty(&tw.get_smart_routing_stats())?);

    Ok(())
}
