use tidewatch::{
    CostTier, EngineConfig, FallbackStrategy, ProviderDescriptor, RoutingContext, TrackingError,
    TrackingKind,
};
use tidewatch_mock::MockBehavior;

use crate::helpers::*;

fn catalog() -> Vec<std::sync::Arc<dyn tidewatch::TrackingProvider>> {
    vec![
        scripted_with(ProviderDescriptor::new("agg", CostTier::Premium, 0.93).aggregator()).0,
        scripted("legacy", CostTier::Paid, 0.55).0,
        scripted("fm", CostTier::Freemium, 0.75).0,
        scripted("carrier-direct", CostTier::Premium, 0.97).0,
        scripted("portal", CostTier::Paid, 0.82).0,
        scripted("ais", CostTier::Free, 0.65).0,
    ]
}

#[tokio::test]
async fn decision_orders_buckets_and_explains_itself() {
    let tw = engine(catalog());
    let ctx = RoutingContext::new(CONTAINER, TrackingKind::Container);
    let d = tw.analyze_routing(&ctx);
    assert_eq!(
        d.prioritized_providers,
        vec!["ais", "carrier-direct", "portal", "fm", "agg", "legacy"]
    );
    assert_eq!(d.fallback_strategy, FallbackStrategy::PaidFirst);
    assert!(d.reasoning.contains("carrier-direct(high"));
}

#[tokio::test]
async fn repeated_failures_push_a_provider_to_the_tail() {
    let (direct, cd) = scripted("carrier-direct", CostTier::Premium, 0.97);
    let (portal, _cp) = scripted("portal", CostTier::Paid, 0.92);
    cd.set_default(MockBehavior::Fail(TrackingError::invalid_response(
        "carrier-direct",
        "html instead of json",
    )))
    .await;
    let (tw, _clock) = engine_with_clock(vec![direct, portal], EngineConfig::default());

    for i in 0..3 {
        tw.fetch_from_multiple_sources(&format!("BK{i}"), None, None, false)
            .await
            .unwrap();
    }

    let d = tw.analyze_routing(&RoutingContext::new("BK9", TrackingKind::Booking));
    assert_eq!(d.prioritized_providers, vec!["portal", "carrier-direct"]);
    assert!(d.reasoning.contains("deprioritized"));

    // The tail provider is never reached once the healthy one answers well.
    tw.fetch_from_multiple_sources("BK9", None, None, false)
        .await
        .unwrap();
    assert_eq!(cd.call_count().await, 3);
}

#[tokio::test]
async fn routing_stats_count_decisions() {
    let tw = engine(catalog());
    for n in ["BK1", "BK2"] {
        tw.fetch_from_multiple_sources(n, None, None, false)
            .await
            .unwrap();
    }
    tw.fetch_from_multiple_sources("BK3", None, None, true)
        .await
        .unwrap();

    let stats = tw.get_smart_routing_stats();
    assert_eq!(stats.decisions, 3);
    assert_eq!(stats.by_strategy.get("paid_first"), Some(&2));
    assert_eq!(stats.by_strategy.get("free_first"), Some(&1));
    assert_eq!(stats.top_choice.get("ais"), Some(&3));
    assert_eq!(stats.empty, 0);
}
