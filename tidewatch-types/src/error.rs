use core::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the tidewatch workspace.
///
/// The first six variants form the closed provider taxonomy; every one of them is
/// tagged with the provider that produced it. The remaining variants are raised by
/// the engine itself.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TrackingError {
    /// The provider rejected our credentials (HTTP 401/403).
    #[error("{provider} rejected credentials: {msg}")]
    Auth {
        /// Provider name.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The provider has no record of the requested shipment.
    #[error("{provider} has no record of {what}")]
    NotFound {
        /// Provider name.
        provider: String,
        /// Description of the missing resource, e.g. "container MSCU1234565".
        what: String,
    },

    /// The provider refused the call because of rate limiting, or admission control
    /// denied the call before it was made.
    #[error("{provider} rate limited (retry_after_ms={retry_after_ms:?})")]
    RateLimit {
        /// Provider name.
        provider: String,
        /// Hint for when the provider may be called again.
        retry_after_ms: Option<u64>,
    },

    /// The provider call exceeded its timeout budget.
    #[error("{provider} timed out after {timeout_ms}ms")]
    Timeout {
        /// Provider name.
        provider: String,
        /// Budget that was exceeded.
        timeout_ms: u64,
    },

    /// Connection-level failure (refused, reset, DNS, 5xx).
    #[error("{provider} network error: {msg}")]
    Network {
        /// Provider name.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The provider answered but the payload could not be used.
    #[error("{provider} returned an invalid response: {msg}")]
    InvalidResponse {
        /// Provider name.
        provider: String,
        /// Human-readable error message.
        msg: String,
    },

    /// No provider produced usable data. `message` is the user-facing text.
    #[error("{message}")]
    Degraded {
        /// True when retrying shortly is likely to help.
        transient: bool,
        /// User-facing message.
        message: String,
        /// Every per-provider error collected while trying.
        errors: Vec<TrackingError>,
    },

    /// Merging was asked to work on a set with no success/partial results.
    #[error("no usable tracking data: {what}")]
    NoData {
        /// Description of what was being merged.
        what: String,
    },

    /// No registered provider supports the requested tracking-number kind.
    #[error("no provider supports {kind} lookups")]
    Unsupported {
        /// Kind label, e.g. "container".
        kind: String,
    },

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// A queued lookup was dropped before its batch completed.
    #[error("batched lookup dropped before completion")]
    BatchDropped,
}

/// Closed provider error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Credentials rejected.
    AuthError,
    /// No record of the shipment.
    NotFound,
    /// Rate limited by the provider or by admission control.
    RateLimit,
    /// Call exceeded its timeout budget.
    Timeout,
    /// Connection-level failure.
    NetworkError,
    /// Unusable payload.
    InvalidResponse,
}

impl ErrorCategory {
    /// Stable label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AuthError => "AUTH_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimit => "RATE_LIMIT",
            Self::Timeout => "TIMEOUT",
            Self::NetworkError => "NETWORK_ERROR",
            Self::InvalidResponse => "INVALID_RESPONSE",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl TrackingError {
    /// Helper: build an `Auth` error.
    pub fn auth(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Auth {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build a `NotFound` error.
    pub fn not_found(provider: impl Into<String>, what: impl Into<String>) -> Self {
        Self::NotFound {
            provider: provider.into(),
            what: what.into(),
        }
    }

    /// Helper: build a `RateLimit` error with an optional retry-after hint.
    pub fn rate_limit(provider: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self::RateLimit {
            provider: provider.into(),
            retry_after_ms: retry_after.map(millis),
        }
    }

    /// Helper: build a `Timeout` error for the given budget.
    pub fn timeout(provider: impl Into<String>, budget: Duration) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout_ms: millis(budget),
        }
    }

    /// Helper: build a `Network` error.
    pub fn network(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `InvalidResponse` error.
    pub fn invalid_response(provider: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            msg: msg.into(),
        }
    }

    /// Taxonomy category for provider-level errors; `None` for engine-level variants.
    #[must_use]
    pub const fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Auth { .. } => Some(ErrorCategory::AuthError),
            Self::NotFound { .. } => Some(ErrorCategory::NotFound),
            Self::RateLimit { .. } => Some(ErrorCategory::RateLimit),
            Self::Timeout { .. } => Some(ErrorCategory::Timeout),
            Self::Network { .. } => Some(ErrorCategory::NetworkError),
            Self::InvalidResponse { .. } => Some(ErrorCategory::InvalidResponse),
            _ => None,
        }
    }

    /// Provider that produced this error, if it is a provider-level error.
    #[must_use]
    pub fn provider(&self) -> Option<&str> {
        match self {
            Self::Auth { provider, .. }
            | Self::NotFound { provider, .. }
            | Self::RateLimit { provider, .. }
            | Self::Timeout { provider, .. }
            | Self::Network { provider, .. }
            | Self::InvalidResponse { provider, .. } => Some(provider.as_str()),
            _ => None,
        }
    }

    /// Retry-after hint carried by rate-limit errors.
    #[must_use]
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimit { retry_after_ms, .. } => retry_after_ms.map(Duration::from_millis),
            _ => None,
        }
    }

    /// Whether this error suggests that trying again shortly may succeed.
    ///
    /// Only rate limits and network failures qualify; a timeout alone is not
    /// considered evidence of a transient outage.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimit { .. } | Self::Network { .. } => true,
            Self::Degraded { transient, .. } => *transient,
            _ => false,
        }
    }

    /// Whether this error counts against a provider's circuit breaker.
    ///
    /// Rate limits are expected behavior, not faults. Anything else an adapter
    /// returns is, including errors outside the provider taxonomy.
    #[must_use]
    pub const fn counts_as_fault(&self) -> bool {
        !matches!(self, Self::RateLimit { .. })
    }

    /// Whether a retry against the same provider may help.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Network { .. })
    }

    /// Flatten nested `Degraded` structures into a plain vector.
    #[must_use]
    pub fn flatten(self) -> Vec<Self> {
        match self {
            Self::Degraded { errors, .. } => errors.into_iter().flat_map(Self::flatten).collect(),
            other => vec![other],
        }
    }
}
