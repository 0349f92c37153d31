use std::time::Duration;

use tidewatch::{
    CostTier, Priority, ProviderDescriptor, TrackOptions, TrackRequest, TrackingError,
    TrackingKind, TrackingKinds,
};
use tidewatch_mock::MockBehavior;
use tokio::time::Instant;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn full_batch_flushes_at_once_and_the_rest_waits_for_the_timer() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);
    let start = Instant::now();

    let mut tasks = Vec::new();
    for i in 0..12 {
        let tw = tw.clone();
        tasks.push(tokio::spawn(async move {
            let res = tw
                .track_with_optimization(&format!("BK{i:03}"), None, TrackOptions::default())
                .await;
            (res, start.elapsed())
        }));
    }

    let mut early = 0;
    let mut late = 0;
    for t in tasks {
        let (res, elapsed) = t.await.unwrap();
        assert!(res.is_ok());
        if elapsed < Duration::from_secs(2) {
            early += 1;
        } else {
            late += 1;
        }
    }
    assert_eq!(early, 10);
    assert_eq!(late, 2);
    assert_eq!(ca.call_count().await, 12);
    assert_eq!(tw.pending_batched().await, 0);
}

#[tokio::test(start_paused = true)]
async fn a_lone_request_is_flushed_by_the_timer() {
    let (a, _ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);
    let start = Instant::now();

    tw.track_with_optimization(BOOKING, None, TrackOptions::default())
        .await
        .unwrap();
    let elapsed = start.elapsed();
    assert!(elapsed >= Duration::from_secs(2));
    assert!(elapsed < Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn urgent_lookups_skip_the_queue() {
    let (a, _ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);
    let start = Instant::now();

    tw.track_with_optimization(BOOKING, None, TrackOptions::urgent())
        .await
        .unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn one_failure_does_not_fail_its_batch_mates() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    ca.set_for("BK-BAD", MockBehavior::Fail(TrackingError::not_found("a", "BK-BAD")))
        .await;
    let tw = engine(vec![a]);

    let results = tw
        .track_multiple(["BK-1", "BK-BAD", "BK-2"], TrackOptions::default())
        .await;

    assert_eq!(results.len(), 3);
    assert!(results["BK-1"].is_ok());
    assert!(results["BK-2"].is_ok());
    assert!(matches!(
        results["BK-BAD"],
        Err(TrackingError::Degraded {
            transient: false,
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn queues_are_separated_by_priority() {
    let (a, _ca) = scripted("a", CostTier::Paid, 0.95);
    let mut cfg = tidewatch::EngineConfig::default();
    cfg.batch.batch_size = 2;
    let tw = engine_cfg(vec![a], cfg);
    let start = Instant::now();

    let normal = TrackOptions::default();
    let low = TrackOptions {
        priority: Priority::Low,
        ..TrackOptions::default()
    };
    // One normal and one low request do not make a full batch of two.
    let (x, y) = tokio::join!(
        tw.track_with_optimization("BK-N", None, normal),
        tw.track_with_optimization("BK-L", None, low),
    );
    assert!(x.is_ok() && y.is_ok());
    assert!(start.elapsed() >= Duration::from_secs(2));
}

#[tokio::test]
async fn urgent_fan_out_returns_every_number() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let tw = engine(vec![a]);
    let numbers: Vec<String> = (0..7).map(|i| format!("BK{i}")).collect();

    let results = tw
        .track_multiple(numbers.clone(), TrackOptions::urgent())
        .await;

    assert_eq!(results.len(), 7);
    for n in &numbers {
        assert!(results[n].is_ok(), "{n}");
    }
    assert_eq!(ca.call_count().await, 7);
}

#[tokio::test(start_paused = true)]
async fn declared_kinds_are_honoured_per_request() {
    let (a, ca) = scripted_with(
        ProviderDescriptor::new("bookings", CostTier::Paid, 0.95)
            .with_kinds(TrackingKinds::BOOKING),
    );
    let tw = engine(vec![a]);

    let results = tw
        .track_multiple(
            vec![
                TrackRequest::with_kind(BILL, TrackingKind::Booking),
                TrackRequest::from(CONTAINER),
            ],
            TrackOptions::default(),
        )
        .await;

    assert!(results[BILL].is_ok());
    assert!(matches!(
        results[CONTAINER],
        Err(TrackingError::Unsupported { .. })
    ));
    assert_eq!(
        ca.requests().await,
        vec![(BILL.to_string(), TrackingKind::Booking)]
    );
}
