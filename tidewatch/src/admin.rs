use tidewatch_core::{CacheStats, CircuitStatus, ProviderStats, RoutingStats, TrackingError};

use crate::core::Tidewatch;

/// Read-only and reset operations for operators. Every snapshot is serializable.
impl Tidewatch {
    /// Call accounting for every provider, in name order.
    pub fn get_provider_stats(&self) -> Vec<ProviderStats> {
        self.inner.router.health().stats()
    }

    /// Circuit breaker snapshot for every provider, in name order.
    pub fn get_circuit_breaker_status(&self) -> Vec<CircuitStatus> {
        self.inner.router.health().circuit_status()
    }

    /// Close `provider`'s circuit and forget its recent failures.
    ///
    /// # Errors
    /// Returns `InvalidArg` for an unknown provider.
    pub fn reset_circuit_breaker(&self, provider: &str) -> Result<(), TrackingError> {
        self.inner.router.health().reset(provider)?;
        #[cfg(feature = "tracing")]
        tracing::info!(provider = provider, "circuit breaker reset");
        Ok(())
    }

    /// Cache occupancy and hit counters.
    pub async fn get_cache_stats(&self) -> CacheStats {
        self.inner.cache.stats().await
    }

    /// Drop every cached entry and reset the cache counters.
    pub async fn clear_cache(&self) {
        self.inner.cache.clear().await;
        #[cfg(feature = "tracing")]
        tracing::info!("response cache cleared");
    }

    /// Routing decision counters.
    pub fn get_smart_routing_stats(&self) -> RoutingStats {
        self.inner.router.stats()
    }
}
