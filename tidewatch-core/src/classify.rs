//! Mapping of raw adapter failures onto the closed error taxonomy.

use std::time::Duration;

use crate::TrackingError;

/// Raw failure observed by an adapter before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterFault {
    /// The call exceeded the given budget.
    Timeout(Duration),
    /// The connection was refused, reset, or never established.
    ConnectionRefused(String),
    /// The provider answered with a non-success HTTP status.
    Http {
        /// Status code.
        status: u16,
        /// Parsed `Retry-After` header, if any.
        retry_after: Option<Duration>,
        /// Body excerpt for diagnostics.
        body: Option<String>,
    },
    /// The provider answered but the body could not be decoded.
    Decode(String),
    /// Anything else.
    Other(String),
}

/// Classify a raw adapter fault for `provider`.
///
/// - 401/403 become `Auth`, 404 becomes `NotFound`, 429 becomes `RateLimit`
///   carrying any `Retry-After` hint.
/// - Other HTTP statuses, refused connections and unclassified faults become `Network`.
/// - Decode failures become `InvalidResponse`.
#[must_use]
pub fn classify_fault(provider: &str, fault: AdapterFault) -> TrackingError {
    let err = match fault {
        AdapterFault::Timeout(budget) => TrackingError::timeout(provider, budget),
        AdapterFault::ConnectionRefused(msg) => {
            TrackingError::network(provider, format!("connection refused: {msg}"))
        }
        AdapterFault::Http {
            status,
            retry_after,
            body,
        } => match status {
            401 | 403 => TrackingError::auth(provider, format!("HTTP {status}")),
            404 => TrackingError::not_found(
                provider,
                body.unwrap_or_else(|| "requested shipment".to_string()),
            ),
            429 => TrackingError::rate_limit(provider, retry_after),
            _ => {
                let detail = body.map(|b| format!(": {b}")).unwrap_or_default();
                TrackingError::network(provider, format!("HTTP {status}{detail}"))
            }
        },
        AdapterFault::Decode(msg) => TrackingError::invalid_response(provider, msg),
        AdapterFault::Other(msg) => TrackingError::network(provider, msg),
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(
        provider = provider,
        category = ?err.category(),
        "classified adapter fault"
    );

    err
}
