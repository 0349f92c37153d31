use async_trait::async_trait;

use crate::types::ProviderResponse;
use crate::{ProviderDescriptor, TrackingError, TrackingKind};

/// Contract implemented once per tracking provider.
///
/// Adapters are thin request/response mappers. They never apply rate limiting,
/// retries or timeouts themselves; the engine wraps every call with those.
/// Faults should be mapped through [`classify_fault`](crate::classify_fault) so
/// that every adapter reports the same taxonomy.
#[async_trait]
pub trait TrackingProvider: Send + Sync {
    /// Static catalog entry for this provider.
    fn descriptor(&self) -> &ProviderDescriptor;

    /// A stable identifier used in routing order, stats and errors.
    fn name(&self) -> &str {
        &self.descriptor().name
    }

    /// Whether the adapter has what it needs (typically a credential) to make calls.
    ///
    /// Default: `true`. Adapters requiring an API key should return `false` when the
    /// key is missing; the registry then drops them unless they are free-tier.
    fn is_available(&self) -> bool {
        true
    }

    /// Whether this provider *claims* to serve the given kind.
    fn supports_kind(&self, kind: TrackingKind) -> bool {
        self.descriptor().kinds.supports(kind)
    }

    /// Look up a shipment.
    ///
    /// `tracking_number` is already normalised (trimmed, upper-case).
    async fn track_shipment(
        &self,
        tracking_number: &str,
        kind: TrackingKind,
    ) -> Result<ProviderResponse, TrackingError>;
}
