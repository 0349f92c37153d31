use tidewatch::{CallerTier, CostTier, ResultStatus};
use tidewatch_mock::MockBehavior;

use crate::helpers::*;

#[tokio::test]
async fn highly_reliable_success_stops_the_loop() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, cb) = scripted("b", CostTier::Paid, 0.85);
    ca.set_default(MockBehavior::Return(in_transit("MSC"))).await;
    let tw = engine(vec![a, b]);

    let results = tw
        .fetch_from_multiple_sources(CONTAINER, None, None, false)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].provider, "a");
    assert_eq!(ca.call_count().await, 1);
    assert_eq!(cb.call_count().await, 0);
}

#[tokio::test]
async fn paid_first_continues_past_a_weak_success() {
    let (free, cf) = scripted("free", CostTier::Free, 0.60);
    let (paid, cp) = scripted("paid", CostTier::Paid, 0.92);
    let tw = engine(vec![paid, free]);

    let results = tw
        .fetch_from_multiple_sources(CONTAINER, None, None, false)
        .await
        .unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(order, vec!["free", "paid"]);
    assert_eq!(cf.call_count().await, 1);
    assert_eq!(cp.call_count().await, 1);
}

#[tokio::test]
async fn cost_optimization_stops_at_first_success() {
    let (free, cf) = scripted("free", CostTier::Free, 0.60);
    let (paid, cp) = scripted("paid", CostTier::Paid, 0.92);
    let tw = engine(vec![free, paid]);

    let results = tw
        .fetch_from_multiple_sources(CONTAINER, None, None, true)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(cf.call_count().await, 1);
    assert_eq!(cp.call_count().await, 0);
}

#[tokio::test]
async fn free_callers_route_cost_first() {
    let (free, _cf) = scripted("free", CostTier::Free, 0.60);
    let (paid, cp) = scripted("paid", CostTier::Paid, 0.92);
    let tw = engine(vec![free, paid]);

    tw.fetch_from_multiple_sources(CONTAINER, None, Some(CallerTier::Free), false)
        .await
        .unwrap();
    assert_eq!(cp.call_count().await, 0);
}

#[tokio::test]
async fn reliability_first_requires_more_than_085() {
    let (free, cf) = scripted("free", CostTier::Free, 0.80);
    let (medium, cm) = scripted("medium", CostTier::Paid, 0.86);
    let (other, co) = scripted("other", CostTier::Paid, 0.70);
    let tw = engine(vec![other, medium, free]);

    let results = tw
        .fetch_from_multiple_sources(BILL, None, Some(CallerTier::Enterprise), false)
        .await
        .unwrap();

    let order: Vec<&str> = results.iter().map(|r| r.provider.as_str()).collect();
    assert_eq!(order, vec!["free", "medium"]);
    assert_eq!(cf.call_count().await, 1);
    assert_eq!(cm.call_count().await, 1);
    assert_eq!(co.call_count().await, 0);
}

#[tokio::test]
async fn partial_answers_never_stop_the_loop() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, cb) = scripted("b", CostTier::Paid, 0.85);
    ca.set_default(MockBehavior::Partial(in_transit("MSC"))).await;
    let tw = engine(vec![a, b]);

    let results = tw
        .fetch_from_multiple_sources(CONTAINER, None, None, false)
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status(), ResultStatus::Partial);
    assert_eq!(results[1].status(), ResultStatus::Success);
    assert_eq!(ca.call_count().await, 1);
    assert_eq!(cb.call_count().await, 1);
}
