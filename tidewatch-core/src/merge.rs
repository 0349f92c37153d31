use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::TrackingError;
use crate::types::{MergedShipment, RawResult, TimelineEvent};

/// Merge per-provider results into one canonical shipment record.
///
/// - Error results are ignored.
/// - Usable results are ranked by reliability, highest first. Ties keep input
///   order, so callers pass results in routing order.
/// - The top-ranked result is the primary source: it supplies status, carrier,
///   route, vessel and ETA.
/// - Timeline events from every usable result are unioned. Events with the same
///   `(timestamp, status, location)` collapse to the copy from the higher-ranked
///   source, and the timeline is returned oldest first.
///
/// # Errors
/// Returns `TrackingError::NoData` if no result is a success or partial.
pub fn prioritize_data_sources(results: &[RawResult]) -> Result<MergedShipment, TrackingError> {
    let mut ranked: Vec<&RawResult> = results.iter().filter(|r| r.is_usable()).collect();
    // Stable: equal reliabilities keep routing order.
    ranked.sort_by(|a, b| b.reliability.total_cmp(&a.reliability));

    let Some(primary) = ranked.first().copied() else {
        let what = results
            .first()
            .map_or_else(|| "empty result set".to_string(), |r| r.tracking_number.clone());
        return Err(TrackingError::NoData { what });
    };
    let Some(head) = primary.payload() else {
        return Err(TrackingError::NoData {
            what: primary.tracking_number.clone(),
        });
    };

    let mut seen: HashSet<(DateTime<Utc>, &str, &str)> = HashSet::new();
    let mut timeline: Vec<TimelineEvent> = Vec::new();
    let mut sources: Vec<String> = Vec::with_capacity(ranked.len());
    for r in &ranked {
        let Some(payload) = r.payload() else { continue };
        if !sources.contains(&r.provider) {
            sources.push(r.provider.clone());
        }
        for ev in &payload.events {
            if seen.insert((ev.timestamp, ev.status.as_str(), ev.location.as_str())) {
                timeline.push(ev.clone());
            }
        }
    }
    timeline.sort_by_key(|e| e.timestamp);

    Ok(MergedShipment {
        tracking_number: primary.tracking_number.clone(),
        carrier: head.carrier.clone(),
        status: head.status,
        origin: head.origin.clone(),
        destination: head.destination.clone(),
        vessel: head.vessel.clone(),
        eta: head.eta,
        timeline,
        data_source: primary.provider.clone(),
        reliability: primary.reliability,
        sources,
        last_updated: head.observed_at.unwrap_or(primary.fetched_at),
    })
}
