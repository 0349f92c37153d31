use tidewatch_core::TrackingError;

/// Collapse the errors collected for one tracking number into a single degraded outcome.
///
/// Rules:
/// - If any error is a rate limit or a network failure → transient ("try again shortly").
/// - Otherwise → permanent ("verify the tracking number").
///
/// Nested `Degraded` errors are flattened so the collected list stays one level deep.
pub fn degrade(number: &str, errors: Vec<TrackingError>) -> TrackingError {
    let errors: Vec<TrackingError> = errors.into_iter().flat_map(TrackingError::flatten).collect();
    let transient = errors.iter().any(TrackingError::is_transient);
    let message = if transient {
        format!("Tracking data for {number} is temporarily unavailable; please try again shortly.")
    } else {
        format!("No tracking data found for {number}; please verify the tracking number.")
    };
    TrackingError::Degraded {
        transient,
        message,
        errors,
    }
}
