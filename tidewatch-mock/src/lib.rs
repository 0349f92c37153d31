//! Mock tracking providers.
//!
//! - [`MockProvider`] answers from deterministic fixtures. It stands in for real
//!   adapters in examples and when no provider credential is configured.
//! - [`ScriptedProvider`] defers every answer to a [`ScriptedController`] so tests can
//!   script successes, failures and hangs and count calls.

use std::time::Duration;

use async_trait::async_trait;
use tidewatch_core::{
    CostTier, ProviderDescriptor, ProviderResponse, TrackingError, TrackingKind, TrackingProvider,
};

mod dynamic;
mod fixtures;

pub use dynamic::{MockBehavior, ScriptedController, ScriptedProvider};
pub use fixtures::shipment_for;

/// Fixture-backed provider.
///
/// A few number prefixes force specific outcomes:
/// - `NOTFOUND…` answers `NotFound`;
/// - `FAIL…` answers a network error;
/// - `RATELIMIT…` answers a rate limit with a 5 second hint;
/// - `TIMEOUT…` sleeps past the descriptor's timeout budget.
#[derive(Debug, Clone)]
pub struct MockProvider {
    descriptor: ProviderDescriptor,
    available: bool,
}

impl MockProvider {
    /// Mock with the given catalog entry.
    #[must_use]
    pub const fn new(descriptor: ProviderDescriptor) -> Self {
        Self {
            descriptor,
            available: true,
        }
    }

    /// Free-tier mock serving every kind.
    #[must_use]
    pub fn free(name: &str, reliability: f64) -> Self {
        Self::new(ProviderDescriptor::new(name, CostTier::Free, reliability))
    }

    /// Mark the mock as missing its credential.
    #[must_use]
    pub const fn without_credential(mut self) -> Self {
        self.available = false;
        self
    }
}

#[async_trait]
impl TrackingProvider for MockProvider {
    fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn track_shipment(
        &self,
        tracking_number: &str,
        kind: TrackingKind,
    ) -> Result<ProviderResponse, TrackingError> {
        let name = self.name();
        if tracking_number.starts_with("NOTFOUND") {
            return Err(TrackingError::not_found(
                name,
                format!("{} {tracking_number}", kind.as_str()),
            ));
        }
        if tracking_number.starts_with("FAIL") {
            return Err(TrackingError::network(name, "forced failure"));
        }
        if tracking_number.starts_with("RATELIMIT") {
            return Err(TrackingError::rate_limit(name, Some(Duration::from_secs(5))));
        }
        if tracking_number.starts_with("TIMEOUT") {
            tokio::time::sleep(self.descriptor.timeout + Duration::from_secs(1)).await;
        }
        Ok(ProviderResponse::Complete(shipment_for(tracking_number, kind)))
    }
}
