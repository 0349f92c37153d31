//! Immutable catalog of the providers an engine may call.

use std::collections::HashSet;
use std::sync::Arc;

use tidewatch_core::{ProviderDescriptor, TrackingError, TrackingKind, TrackingProvider};

/// Registered providers, in registration order.
///
/// Construction keeps every adapter that reports a configured credential and
/// silently drops the rest, except free-tier providers, which are always kept.
/// Nothing can be added or removed afterwards.
pub struct ProviderRegistry {
    providers: Vec<Arc<dyn TrackingProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.providers.iter().map(|p| p.name()))
            .finish()
    }
}

impl ProviderRegistry {
    /// Build the registry.
    ///
    /// # Errors
    /// Returns `InvalidArg` if a descriptor fails validation or two providers share a name.
    pub fn new(
        candidates: impl IntoIterator<Item = Arc<dyn TrackingProvider>>,
    ) -> Result<Self, TrackingError> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut providers = Vec::new();
        for p in candidates {
            let d = p.descriptor();
            d.validate()?;
            if !seen.insert(d.name.clone()) {
                return Err(TrackingError::InvalidArg(format!(
                    "duplicate provider name: {}",
                    d.name
                )));
            }
            if !p.is_available() && d.cost_tier != tidewatch_core::CostTier::Free {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    provider = %d.name,
                    "dropping provider without configured credential"
                );
                continue;
            }
            providers.push(p);
        }
        Ok(Self { providers })
    }

    /// Descriptors of providers that serve `kind`, or of every provider.
    pub fn list(&self, kind: Option<TrackingKind>) -> Vec<&ProviderDescriptor> {
        self.providers
            .iter()
            .map(|p| p.descriptor())
            .filter(|d| kind.is_none_or(|k| d.kinds.supports(k)))
            .collect()
    }

    /// Descriptor of the provider called `name`.
    pub fn get(&self, name: &str) -> Option<&ProviderDescriptor> {
        self.adapter(name).map(|p| p.descriptor())
    }

    /// Adapter handle for the provider called `name`.
    pub fn adapter(&self, name: &str) -> Option<&Arc<dyn TrackingProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Number of registered providers.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether no provider survived construction.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
