//! Shipment payloads, per-provider results and the merged output record.

use core::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::TrackingError;

/// Overall status of a shipment as reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    /// Booked, not yet moving.
    Booked,
    /// Moving between ports.
    InTransit,
    /// Waiting at a port or terminal.
    AtPort,
    /// Delivered to the consignee. Terminal.
    Delivered,
    /// Held, damaged, or otherwise needing attention.
    Exception,
    /// Provider gave no usable status.
    Unknown,
}

impl ShipmentStatus {
    /// Stable, snake-case identifier.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booked => "booked",
            Self::InTransit => "in_transit",
            Self::AtPort => "at_port",
            Self::Delivered => "delivered",
            Self::Exception => "exception",
            Self::Unknown => "unknown",
        }
    }

    /// Whether no further movement is expected.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered)
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event on a shipment's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// When the event happened.
    pub timestamp: DateTime<Utc>,
    /// Provider's event label, e.g. "Departed".
    pub status: String,
    /// Where the event happened.
    pub location: String,
    /// Free-text detail.
    pub description: Option<String>,
}

impl TimelineEvent {
    /// Create an event without a description.
    pub fn new(
        timestamp: DateTime<Utc>,
        status: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            status: status.into(),
            location: location.into(),
            description: None,
        }
    }

    /// Attach a description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Fixed-shape payload every adapter maps its provider's response into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipmentPayload {
    /// Operating carrier.
    pub carrier: Option<String>,
    /// Overall status.
    pub status: ShipmentStatus,
    /// Port of loading.
    pub origin: Option<String>,
    /// Port of discharge.
    pub destination: Option<String>,
    /// Current vessel.
    pub vessel: Option<String>,
    /// Estimated time of arrival.
    pub eta: Option<DateTime<Utc>>,
    /// Timeline events in provider order.
    pub events: Vec<TimelineEvent>,
    /// When the provider last refreshed this data, if it says.
    pub observed_at: Option<DateTime<Utc>>,
}

impl ShipmentPayload {
    /// Empty payload with the given status.
    #[must_use]
    pub const fn new(status: ShipmentStatus) -> Self {
        Self {
            carrier: None,
            status,
            origin: None,
            destination: None,
            vessel: None,
            eta: None,
            events: Vec::new(),
            observed_at: None,
        }
    }

    /// Set the carrier.
    #[must_use]
    pub fn with_carrier(mut self, carrier: impl Into<String>) -> Self {
        self.carrier = Some(carrier.into());
        self
    }

    /// Set origin and destination.
    #[must_use]
    pub fn with_route(mut self, origin: impl Into<String>, destination: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self.destination = Some(destination.into());
        self
    }

    /// Set the vessel.
    #[must_use]
    pub fn with_vessel(mut self, vessel: impl Into<String>) -> Self {
        self.vessel = Some(vessel.into());
        self
    }

    /// Set the ETA.
    #[must_use]
    pub const fn with_eta(mut self, eta: DateTime<Utc>) -> Self {
        self.eta = Some(eta);
        self
    }

    /// Append a timeline event.
    #[must_use]
    pub fn with_event(mut self, event: TimelineEvent) -> Self {
        self.events.push(event);
        self
    }

    /// Set the provider-side refresh time.
    #[must_use]
    pub const fn observed_at(mut self, at: DateTime<Utc>) -> Self {
        self.observed_at = Some(at);
        self
    }
}

/// What an adapter returns on a non-error call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderResponse {
    /// Full answer.
    Complete(ShipmentPayload),
    /// Usable but incomplete answer (e.g. status without timeline).
    Partial(ShipmentPayload),
}

/// Outcome of one provider attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum RawOutcome {
    /// Full answer.
    Success(ShipmentPayload),
    /// Usable but incomplete answer.
    Partial(ShipmentPayload),
    /// The attempt failed or was denied admission.
    Error(TrackingError),
}

/// Status label of a [`RawOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Full answer.
    Success,
    /// Usable but incomplete answer.
    Partial,
    /// Failure.
    Error,
}

/// One provider's answer for one tracking number. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    /// Provider that answered.
    pub provider: String,
    /// Normalised tracking number the provider was asked about.
    pub tracking_number: String,
    /// Tagged outcome.
    pub outcome: RawOutcome,
    /// Provider reliability at the time of the call.
    pub reliability: f64,
    /// When the attempt completed.
    pub fetched_at: DateTime<Utc>,
}

impl RawResult {
    /// Build a result from an adapter's response.
    pub fn from_response(
        provider: impl Into<String>,
        tracking_number: impl Into<String>,
        reliability: f64,
        fetched_at: DateTime<Utc>,
        response: Result<ProviderResponse, TrackingError>,
    ) -> Self {
        let outcome = match response {
            Ok(ProviderResponse::Complete(p)) => RawOutcome::Success(p),
            Ok(ProviderResponse::Partial(p)) => RawOutcome::Partial(p),
            Err(e) => RawOutcome::Error(e),
        };
        Self {
            provider: provider.into(),
            tracking_number: tracking_number.into(),
            outcome,
            reliability,
            fetched_at,
        }
    }

    /// Status label.
    #[must_use]
    pub const fn status(&self) -> ResultStatus {
        match self.outcome {
            RawOutcome::Success(_) => ResultStatus::Success,
            RawOutcome::Partial(_) => ResultStatus::Partial,
            RawOutcome::Error(_) => ResultStatus::Error,
        }
    }

    /// Payload of a success or partial result.
    #[must_use]
    pub const fn payload(&self) -> Option<&ShipmentPayload> {
        match &self.outcome {
            RawOutcome::Success(p) | RawOutcome::Partial(p) => Some(p),
            RawOutcome::Error(_) => None,
        }
    }

    /// Error of a failed result.
    #[must_use]
    pub const fn error(&self) -> Option<&TrackingError> {
        match &self.outcome {
            RawOutcome::Error(e) => Some(e),
            _ => None,
        }
    }

    /// Success or partial.
    #[must_use]
    pub const fn is_usable(&self) -> bool {
        !matches!(self.outcome, RawOutcome::Error(_))
    }

    /// Full success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, RawOutcome::Success(_))
    }
}

/// Canonical shipment record derived from one or more provider results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedShipment {
    /// Tracking number.
    pub tracking_number: String,
    /// Carrier from the primary source.
    pub carrier: Option<String>,
    /// Status from the primary source.
    pub status: ShipmentStatus,
    /// Port of loading from the primary source.
    pub origin: Option<String>,
    /// Port of discharge from the primary source.
    pub destination: Option<String>,
    /// Vessel from the primary source.
    pub vessel: Option<String>,
    /// ETA from the primary source.
    pub eta: Option<DateTime<Utc>>,
    /// Union of all sources' events, deduplicated, oldest first.
    pub timeline: Vec<TimelineEvent>,
    /// Primary provider.
    pub data_source: String,
    /// Primary provider's reliability.
    pub reliability: f64,
    /// Every provider that contributed, primary first.
    pub sources: Vec<String>,
    /// When the primary source's data was last refreshed.
    pub last_updated: DateTime<Utc>,
}
