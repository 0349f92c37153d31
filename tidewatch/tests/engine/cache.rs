use tidewatch::{CostTier, TrackOptions};

use crate::helpers::*;

#[tokio::test]
async fn repeated_lookup_is_served_from_cache() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);

    let first = tw
        .fetch_from_multiple_sources(CONTAINER, None, None, false)
        .await
        .unwrap();
    let second = tw
        .fetch_from_multiple_sources(" mscu1234565 ", None, None, false)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(ca.call_count().await, 1);
    let stats = tw.get_cache_stats().await;
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
}

#[tokio::test]
async fn force_fresh_skips_the_cache_read() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);

    let fresh = TrackOptions {
        force_fresh: true,
        ..TrackOptions::urgent()
    };
    tw.track_with_optimization(CONTAINER, None, fresh)
        .await
        .unwrap();
    tw.track_with_optimization(CONTAINER, None, fresh)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 2);

    // Fresh results were still written through.
    tw.track_with_optimization(CONTAINER, None, TrackOptions::urgent())
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 2);
}

#[tokio::test]
async fn clearing_the_cache_forces_a_new_call() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);

    tw.track(CONTAINER, None).await.unwrap();
    tw.clear_cache().await;
    assert_eq!(tw.get_cache_stats().await.entries, 0);
    tw.track(CONTAINER, None).await.unwrap();
    assert_eq!(ca.call_count().await, 2);
}

#[tokio::test]
async fn degraded_lookups_are_not_cached() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    ca.set_default(tidewatch_mock::MockBehavior::Fail(
        tidewatch::TrackingError::not_found("a", CONTAINER),
    ))
    .await;
    let tw = engine(vec![a]);

    assert!(tw.track(CONTAINER, None).await.is_err());
    assert!(tw.track(CONTAINER, None).await.is_err());
    assert_eq!(ca.call_count().await, 2);
    assert_eq!(tw.get_cache_stats().await.entries, 0);
}

#[tokio::test]
async fn cold_urgent_lookup_counts_one_miss() {
    let (a, _ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);

    tw.track_with_optimization(CONTAINER, None, TrackOptions::urgent())
        .await
        .unwrap();
    let stats = tw.get_cache_stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 1));

    tw.track_with_optimization(CONTAINER, None, TrackOptions::urgent())
        .await
        .unwrap();
    let stats = tw.get_cache_stats().await;
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert!((stats.hit_rate - 0.5).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn cold_batched_lookup_counts_one_miss() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);

    tw.track_with_optimization(BILL, None, TrackOptions::default())
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 1);
    let stats = tw.get_cache_stats().await;
    assert_eq!((stats.hits, stats.misses), (0, 1));
}
