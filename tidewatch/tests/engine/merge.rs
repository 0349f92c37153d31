use tidewatch::{CostTier, ShipmentPayload, ShipmentStatus, TimelineEvent, TrackingError};
use tidewatch_mock::MockBehavior;

use crate::helpers::*;

#[tokio::test]
async fn track_merges_sources_with_the_most_reliable_first() {
    let (free, cf) = scripted("ais", CostTier::Free, 0.60);
    let (paid, cp) = scripted("carrier", CostTier::Paid, 0.92);
    cf.set_default(MockBehavior::Return(
        in_transit("MSC").with_event(TimelineEvent::new(ts(1_700_050_000), "Transshipped", "Singapore")),
    ))
    .await;
    cp.set_default(MockBehavior::Return(
        ShipmentPayload::new(ShipmentStatus::AtPort)
            .with_carrier("MSC")
            .with_vessel("MSC OSCAR")
            .with_event(TimelineEvent::new(ts(1_700_000_000), "Departed", "Shanghai"))
            .with_event(TimelineEvent::new(ts(1_700_200_000), "Discharged", "Rotterdam")),
    ))
    .await;
    let tw = engine(vec![free, paid]);

    let merged = tw.track(CONTAINER, None).await.unwrap();

    assert_eq!(merged.tracking_number, CONTAINER);
    assert_eq!(merged.data_source, "carrier");
    assert_eq!(merged.sources, vec!["carrier", "ais"]);
    assert_eq!(merged.status, ShipmentStatus::AtPort);
    assert_eq!(merged.vessel.as_deref(), Some("MSC OSCAR"));
    let places: Vec<&str> = merged.timeline.iter().map(|e| e.location.as_str()).collect();
    assert_eq!(places, vec!["Shanghai", "Singapore", "Rotterdam"]);
}

#[tokio::test]
async fn a_failed_source_does_not_block_the_merge() {
    let (a, ca) = scripted("a", CostTier::Paid, 0.95);
    let (b, _cb) = scripted("b", CostTier::Paid, 0.70);
    ca.set_default(MockBehavior::Fail(TrackingError::network("a", "reset")))
        .await;
    let tw = engine(vec![a, b]);

    let merged = tw.track(CONTAINER, None).await.unwrap();
    assert_eq!(merged.data_source, "b");
    assert!((merged.reliability - 0.70).abs() < f64::EPSILON);
    assert_eq!(merged.sources, vec!["b"]);
}
