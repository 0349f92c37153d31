use std::sync::Arc;

use tidewatch::{CostTier, ProviderDescriptor, Tidewatch, TrackingError, TrackingKind, TrackingKinds};
use tidewatch_mock::MockProvider;

use crate::helpers::*;

#[tokio::test]
async fn paid_providers_without_credentials_are_dropped() {
    let (paid, cp) = scripted("paid", CostTier::Paid, 0.95);
    cp.set_available(false);
    let free = Arc::new(MockProvider::free("ais", 0.6).without_credential());
    let (other, _co) = scripted("other", CostTier::Freemium, 0.7);

    let tw = engine(vec![paid, free, other]);
    let names: Vec<&str> = tw
        .registry()
        .list(None)
        .into_iter()
        .map(|d| d.name.as_str())
        .collect();
    assert_eq!(names, vec!["ais", "other"]);
    assert!(tw.registry().get("paid").is_none());
    assert_eq!(tw.get_provider_stats().len(), 2);
}

#[test]
fn duplicate_names_are_rejected() {
    let err = Tidewatch::builder()
        .with_provider(Arc::new(MockProvider::free("ais", 0.6)))
        .with_provider(Arc::new(MockProvider::free("ais", 0.7)))
        .build()
        .unwrap_err();
    match err {
        TrackingError::InvalidArg(msg) => assert!(msg.contains("duplicate")),
        other => panic!("unexpected: {other:?}"),
    }
}

#[test]
fn an_engine_needs_at_least_one_provider() {
    let err = Tidewatch::builder()
        .with_provider(Arc::new(
            MockProvider::new(ProviderDescriptor::new("paid", CostTier::Paid, 0.9))
                .without_credential(),
        ))
        .build()
        .unwrap_err();
    assert!(matches!(err, TrackingError::InvalidArg(_)));
}

#[test]
fn invalid_descriptors_are_rejected() {
    let err = Tidewatch::builder()
        .with_provider(Arc::new(MockProvider::free("broken", 1.5)))
        .build()
        .unwrap_err();
    assert!(matches!(err, TrackingError::InvalidArg(_)));
}

#[tokio::test]
async fn listing_filters_by_kind() {
    let (vessels, _cv) = scripted_with(
        ProviderDescriptor::new("ais", CostTier::Free, 0.7).with_kinds(TrackingKinds::VESSEL),
    );
    let (boxes, _cb) = scripted_with(
        ProviderDescriptor::new("boxes", CostTier::Paid, 0.9)
            .with_kinds(TrackingKinds::CONTAINER | TrackingKinds::BILL_OF_LADING),
    );
    let tw = engine(vec![vessels, boxes]);
    let reg = tw.registry();

    let names = |kind| {
        reg.list(Some(kind))
            .into_iter()
            .map(|d| d.name.clone())
            .collect::<Vec<_>>()
    };
    assert_eq!(names(TrackingKind::Vessel), vec!["ais"]);
    assert_eq!(names(TrackingKind::BillOfLading), vec!["boxes"]);
    assert!(names(TrackingKind::Booking).is_empty());
    assert_eq!(reg.get("boxes").map(|d| d.cost_tier), Some(CostTier::Paid));
    assert_eq!(reg.len(), 2);
}

#[test]
fn cache_ttl_bounds_outside_five_to_sixty_minutes_are_rejected() {
    let build = |min_ttl: u64, max_ttl: u64| {
        let mut cfg = tidewatch::EngineConfig::default();
        cfg.cache.min_ttl = std::time::Duration::from_secs(min_ttl);
        cfg.cache.max_ttl = std::time::Duration::from_secs(max_ttl);
        Tidewatch::builder()
            .config(cfg)
            .with_provider(Arc::new(MockProvider::free("ais", 0.6)))
            .build()
    };
    assert!(matches!(build(60, 3600), Err(TrackingError::InvalidArg(_))));
    assert!(matches!(build(300, 86_400), Err(TrackingError::InvalidArg(_))));
    assert!(matches!(build(1800, 600), Err(TrackingError::InvalidArg(_))));
    assert!(build(300, 3600).is_ok());
    assert!(build(600, 1800).is_ok());
}
