use std::time::Duration;

use tidewatch::{
    CircuitState, CostTier, EngineConfig, ErrorCategory, ProviderDescriptor, TrackingError,
};
use tidewatch_mock::MockBehavior;

use crate::helpers::*;

fn status_of(tw: &tidewatch::Tidewatch, name: &str) -> tidewatch::CircuitStatus {
    tw.get_circuit_breaker_status()
        .into_iter()
        .find(|s| s.provider == name)
        .expect("provider tracked")
}

#[tokio::test]
async fn full_rate_window_denies_without_calling_the_provider() {
    let (a, ca) = scripted_with(
        ProviderDescriptor::new("a", CostTier::Paid, 0.95).with_rate_limit(1, None),
    );
    let (b, cb) = scripted("b", CostTier::Freemium, 0.70);
    let (tw, clock) = engine_with_clock(vec![a, b], EngineConfig::default());

    tw.fetch_from_multiple_sources("BK1", None, None, false)
        .await
        .unwrap();
    let second = tw
        .fetch_from_multiple_sources("BK2", None, None, false)
        .await
        .unwrap();

    assert_eq!(ca.call_count().await, 1);
    assert_eq!(cb.call_count().await, 1);
    let denied = second[0].error().expect("denied result");
    assert_eq!(denied.category(), Some(ErrorCategory::RateLimit));
    assert_eq!(denied.provider(), Some("a"));
    assert!(denied.retry_after().is_some());
    assert!(second[1].is_success());

    let stats = tw
        .get_provider_stats()
        .into_iter()
        .find(|s| s.provider == "a")
        .unwrap();
    assert_eq!(stats.attempts, 1);
    assert_eq!(stats.rate_limited, 1);
    assert_eq!(stats.failures, 0);
    assert_eq!(status_of(&tw, "a").state, CircuitState::Closed);

    clock.advance(Duration::from_secs(61));
    tw.fetch_from_multiple_sources("BK3", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 2);
}

#[tokio::test]
async fn five_faults_open_the_circuit_and_reset_closes_it() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, _cb) = scripted("b", CostTier::Freemium, 0.70);
    ca.set_default(MockBehavior::Fail(TrackingError::network("a", "502 bad gateway")))
        .await;
    let (tw, _clock) = engine_with_clock(vec![a, b], EngineConfig::default());

    for i in 0..5 {
        tw.fetch_from_multiple_sources(&format!("BK{i}"), None, None, false)
            .await
            .unwrap();
    }
    assert_eq!(ca.call_count().await, 5);
    let status = status_of(&tw, "a");
    assert_eq!(status.state, CircuitState::Open);
    assert_eq!(status.consecutive_failures, 5);
    assert!(status.retry_in_ms.is_some());

    let results = tw
        .fetch_from_multiple_sources("BK5", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 5, "open circuit must not call through");
    assert!(results.iter().any(|r| {
        r.provider == "a" && r.error().and_then(TrackingError::category) == Some(ErrorCategory::RateLimit)
    }));

    tw.reset_circuit_breaker("a").unwrap();
    assert_eq!(status_of(&tw, "a").state, CircuitState::Closed);
    tw.fetch_from_multiple_sources("BK6", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 6);
}

#[tokio::test]
async fn half_open_trial_success_closes_the_circuit() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, _cb) = scripted("b", CostTier::Freemium, 0.70);
    ca.set_default(MockBehavior::Fail(TrackingError::network("a", "reset")))
        .await;
    let (tw, clock) = engine_with_clock(vec![a, b], EngineConfig::default());

    for i in 0..5 {
        tw.fetch_from_multiple_sources(&format!("BK{i}"), None, None, false)
            .await
            .unwrap();
    }
    assert_eq!(status_of(&tw, "a").state, CircuitState::Open);

    clock.advance(Duration::from_secs(31));
    assert_eq!(status_of(&tw, "a").state, CircuitState::HalfOpen);
    ca.set_default(MockBehavior::Return(in_transit("MSC"))).await;
    tw.fetch_from_multiple_sources("BK-TRIAL", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 6);
    let status = status_of(&tw, "a");
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.consecutive_failures, 0);
}

#[tokio::test]
async fn provider_rate_limits_back_off_but_never_open_the_circuit() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, _cb) = scripted("b", CostTier::Freemium, 0.70);
    ca.set_default(MockBehavior::Fail(TrackingError::rate_limit(
        "a",
        Some(Duration::from_secs(2)),
    )))
    .await;
    let (tw, clock) = engine_with_clock(vec![a, b], EngineConfig::default());

    for i in 0..6 {
        tw.fetch_from_multiple_sources(&format!("BK{i}"), None, None, false)
            .await
            .unwrap();
        clock.advance(Duration::from_secs(3));
    }
    assert_eq!(ca.call_count().await, 6);
    let status = status_of(&tw, "a");
    assert_eq!(status.state, CircuitState::Closed);
    assert_eq!(status.consecutive_failures, 0);

    // Within the hinted window the provider is skipped.
    tw.fetch_from_multiple_sources("BK-NEXT", None, None, false)
        .await
        .unwrap();
    tw.fetch_from_multiple_sources("BK-NEXT-2", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 7);
}

#[tokio::test]
async fn resetting_an_unknown_provider_fails() {
    let (a, _ca) = scripted("a", CostTier::Free, 0.7);
    let tw = engine(vec![a]);
    assert!(matches!(
        tw.reset_circuit_breaker("nope"),
        Err(TrackingError::InvalidArg(_))
    ));
}

async fn open_circuit_on_a() -> (
    tidewatch::Tidewatch,
    std::sync::Arc<tidewatch::ManualClock>,
    tidewatch_mock::ScriptedController,
) {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, _cb) = scripted("b", CostTier::Freemium, 0.70);
    ca.set_default(MockBehavior::Fail(TrackingError::network("a", "reset")))
        .await;
    let (tw, clock) = engine_with_clock(vec![a, b], EngineConfig::default());
    for i in 0..5 {
        tw.fetch_from_multiple_sources(&format!("BK{i}"), None, None, false)
            .await
            .unwrap();
    }
    assert_eq!(status_of(&tw, "a").state, CircuitState::Open);
    clock.advance(Duration::from_secs(31));
    (tw, clock, ca)
}

#[tokio::test]
async fn cancelled_trial_lets_the_next_lookup_run_it() {
    let (tw, _clock, ca) = open_circuit_on_a().await;
    ca.set_default(MockBehavior::Hang).await;

    let cancelled = tokio::time::timeout(
        ms(50),
        tw.fetch_from_multiple_sources("BK-HANG", None, None, false),
    )
    .await;
    assert!(cancelled.is_err());
    assert_eq!(ca.call_count().await, 6);
    assert_eq!(status_of(&tw, "a").state, CircuitState::HalfOpen);

    ca.set_default(MockBehavior::Return(in_transit("MSC"))).await;
    tw.fetch_from_multiple_sources("BK-RETRY", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 7);
    assert_eq!(status_of(&tw, "a").state, CircuitState::Closed);
}

#[tokio::test]
async fn unexpected_adapter_error_fails_the_trial() {
    let (tw, clock, ca) = open_circuit_on_a().await;
    ca.set_default(MockBehavior::Fail(TrackingError::InvalidArg(
        "malformed request".into(),
    )))
    .await;

    tw.fetch_from_multiple_sources("BK-BAD", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 6);
    let status = status_of(&tw, "a");
    assert_eq!(status.state, CircuitState::Open);
    assert_eq!(status.cooldown_ms, 60_000);

    clock.advance(Duration::from_secs(61));
    ca.set_default(MockBehavior::Return(in_transit("MSC"))).await;
    tw.fetch_from_multiple_sources("BK-OK", None, None, false)
        .await
        .unwrap();
    assert_eq!(ca.call_count().await, 7);
    assert_eq!(status_of(&tw, "a").state, CircuitState::Closed);
}
