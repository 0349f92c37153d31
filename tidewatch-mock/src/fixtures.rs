use chrono::{DateTime, Duration, Utc};
use tidewatch_core::{ShipmentPayload, ShipmentStatus, TimelineEvent, TrackingKind};

const CARRIERS: [&str; 5] = ["MSC", "Maersk", "CMA CGM", "COSCO", "Hapag-Lloyd"];
const PORTS: [&str; 8] = [
    "Shanghai",
    "Singapore",
    "Rotterdam",
    "Antwerp",
    "Busan",
    "Los Angeles",
    "Hamburg",
    "Ningbo",
];
const VESSELS: [&str; 4] = ["MSC Gulsun", "Ever Ace", "HMM Algeciras", "CMA CGM Jacques Saade"];

// Fixed anchor so fixture timelines never depend on the wall clock.
const ANCHOR_SECS: i64 = 1_700_000_000;

fn seed(number: &str) -> u64 {
    number
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
        })
}

fn pick<T: Copy>(items: &[T], n: u64) -> T {
    let len = items.len() as u64;
    items[usize::try_from(n % len).unwrap_or(0)]
}

/// Deterministic payload for `number`.
///
/// The same number always yields the same carrier, route, status and timeline.
#[must_use]
pub fn shipment_for(number: &str, kind: TrackingKind) -> ShipmentPayload {
    let h = seed(number);
    let status = pick(
        &[
            ShipmentStatus::Booked,
            ShipmentStatus::InTransit,
            ShipmentStatus::AtPort,
            ShipmentStatus::Delivered,
        ],
        h,
    );
    let origin = pick(&PORTS, h >> 8);
    let mut destination = pick(&PORTS, h >> 16);
    if destination == origin {
        destination = pick(&PORTS, (h >> 16) + 1);
    }
    let start = DateTime::from_timestamp(ANCHOR_SECS + i64::try_from(h % 86_400).unwrap_or(0), 0)
        .unwrap_or_default();

    let mut payload = ShipmentPayload::new(status)
        .with_carrier(pick(&CARRIERS, h >> 24))
        .with_route(origin, destination)
        .with_eta(start + Duration::days(24))
        .with_event(TimelineEvent::new(start, "Booked", origin));

    if kind == TrackingKind::Vessel {
        payload = payload.with_vessel(number);
    } else if status != ShipmentStatus::Booked {
        payload = payload.with_vessel(pick(&VESSELS, h >> 32));
    }

    let steps: &[(i64, &str, &str)] = match status {
        ShipmentStatus::Booked => &[],
        ShipmentStatus::InTransit => &[(2, "Loaded", origin), (3, "Departed", origin)],
        ShipmentStatus::AtPort => &[
            (2, "Loaded", origin),
            (3, "Departed", origin),
            (24, "Arrived", destination),
        ],
        _ => &[
            (2, "Loaded", origin),
            (3, "Departed", origin),
            (24, "Arrived", destination),
            (26, "Delivered", destination),
        ],
    };
    for &(day, label, port) in steps {
        payload = payload.with_event(TimelineEvent::new(start + Duration::days(day), label, port));
    }
    payload
}
