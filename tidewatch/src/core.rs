use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::StdRng;
use tidewatch_core::{
    CallerTier, Clock, EngineConfig, MergedShipment, Priority, ProviderDescriptor, RawResult,
    SystemClock, TrackingError, TrackingKind, TrackingProvider, prioritize_data_sources,
};
use tidewatch_middleware::{CacheKey, HealthBook, ResponseCache, retry_delay};
use tokio::task::JoinHandle;

use crate::batch::BatchQueues;
use crate::registry::ProviderRegistry;
use crate::router::util::degrade;
use crate::router::{RoutingContext, RoutingDecision, RoutingEngine};

/// Per-call options for [`Tidewatch::track_with_optimization`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackOptions {
    /// Skip the cache read. Fresh results are still written through.
    pub force_fresh: bool,
    /// `High` bypasses batching.
    pub priority: Priority,
    /// Caller tier used to pick the fallback strategy; `Standard` when unset.
    pub caller_tier: Option<CallerTier>,
    /// Prefer the cheapest route.
    pub cost_optimization: bool,
}

impl TrackOptions {
    /// Options for an interactive lookup that skips batching.
    #[must_use]
    pub fn urgent() -> Self {
        Self {
            priority: Priority::High,
            ..Self::default()
        }
    }
}

/// One entry of a [`Tidewatch::track_multiple`] call.
///
/// Converts from a bare number (kind inferred) or a `(number, kind)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackRequest {
    /// Tracking number as supplied by the caller.
    pub number: String,
    /// Declared kind; inferred from the number when `None`.
    pub kind: Option<TrackingKind>,
}

impl TrackRequest {
    /// Request for `number` with a declared kind.
    #[must_use]
    pub fn with_kind(number: impl Into<String>, kind: TrackingKind) -> Self {
        Self {
            number: number.into(),
            kind: Some(kind),
        }
    }
}

impl From<String> for TrackRequest {
    fn from(number: String) -> Self {
        Self { number, kind: None }
    }
}

impl From<&str> for TrackRequest {
    fn from(number: &str) -> Self {
        number.to_string().into()
    }
}

impl From<&String> for TrackRequest {
    fn from(number: &String) -> Self {
        number.clone().into()
    }
}

impl<S: Into<String>> From<(S, TrackingKind)> for TrackRequest {
    fn from((number, kind): (S, TrackingKind)) -> Self {
        Self::with_kind(number, kind)
    }
}

/// A validated lookup, ready for the orchestrator.
#[derive(Debug, Clone)]
pub(crate) struct Lookup {
    pub(crate) number: String,
    pub(crate) kind: TrackingKind,
    pub(crate) caller_tier: CallerTier,
    pub(crate) cost_optimization: bool,
    pub(crate) force_fresh: bool,
    /// Set once a caller has already consulted the cache for this lookup.
    pub(crate) cache_checked: bool,
}

impl Lookup {
    pub(crate) fn new(
        number: &str,
        kind: Option<TrackingKind>,
        caller_tier: Option<CallerTier>,
        cost_optimization: bool,
    ) -> Result<Self, TrackingError> {
        let number = normalize(number)?;
        let kind = kind.unwrap_or_else(|| TrackingKind::infer(&number));
        Ok(Self {
            number,
            kind,
            caller_tier: caller_tier.unwrap_or_default(),
            cost_optimization,
            force_fresh: false,
            cache_checked: false,
        })
    }

    pub(crate) fn from_options(
        number: &str,
        kind: Option<TrackingKind>,
        opts: TrackOptions,
    ) -> Result<Self, TrackingError> {
        let mut lookup = Self::new(number, kind, opts.caller_tier, opts.cost_optimization)?;
        lookup.force_fresh = opts.force_fresh;
        Ok(lookup)
    }

    pub(crate) fn cache_key(&self) -> CacheKey {
        CacheKey::new(self.number.clone(), self.kind)
    }

    fn routing_context(&self) -> RoutingContext {
        RoutingContext::new(self.number.clone(), self.kind)
            .caller_tier(self.caller_tier)
            .cost_optimization(self.cost_optimization)
    }
}

/// Trim and upper-case a tracking number.
///
/// # Errors
/// Returns `InvalidArg` when nothing is left after trimming.
pub fn normalize(number: &str) -> Result<String, TrackingError> {
    let trimmed = number.trim();
    if trimmed.is_empty() {
        return Err(TrackingError::InvalidArg(
            "tracking number must not be empty".into(),
        ));
    }
    Ok(trimmed.to_ascii_uppercase())
}

pub(crate) struct Engine {
    pub(crate) registry: ProviderRegistry,
    pub(crate) router: RoutingEngine,
    pub(crate) cache: Arc<ResponseCache>,
    pub(crate) batches: BatchQueues,
    pub(crate) cfg: EngineConfig,
    clock: Arc<dyn Clock>,
    rng: Mutex<StdRng>,
    sweeper: Option<JoinHandle<()>>,
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(handle) = self.sweeper.take() {
            handle.abort();
        }
    }
}

/// Shipment-tracking engine.
///
/// Cheap to clone; clones share providers, health, cache and batch queues.
#[derive(Clone)]
pub struct Tidewatch {
    pub(crate) inner: Arc<Engine>,
}

impl std::fmt::Debug for Tidewatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tidewatch")
            .field("providers", &self.inner.registry)
            .field("config", &self.inner.cfg)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Tidewatch`].
pub struct TidewatchBuilder {
    providers: Vec<Arc<dyn TrackingProvider>>,
    cfg: EngineConfig,
    clock: Option<Arc<dyn Clock>>,
    seed: Option<u64>,
}

impl Default for TidewatchBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TidewatchBuilder {
    /// Empty builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
            cfg: EngineConfig::default(),
            clock: None,
            seed: None,
        }
    }

    /// Register a provider adapter.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn TrackingProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Replace the whole engine configuration.
    #[must_use]
    pub fn config(mut self, cfg: EngineConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Inject the time source used for health, rate limits and cache ages.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Seed the jitter applied to breaker cooldowns and retry back-off.
    #[must_use]
    pub const fn rng_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Build the engine.
    ///
    /// When called inside a Tokio runtime, a background task sweeps expired cache
    /// entries every `cache.sweep_interval`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when no provider survives registration, when a
    /// descriptor is invalid or duplicated, when the batching configuration
    /// has a zero size or concurrency, or when the cache TTL bounds leave the
    /// 5 to 60 minute range.
    pub fn build(self) -> Result<Tidewatch, TrackingError> {
        if self.cfg.batch.batch_size == 0 || self.cfg.batch.max_concurrency == 0 {
            return Err(TrackingError::InvalidArg(
                "batch size and concurrency must be positive".into(),
            ));
        }
        self.cfg.cache.validate()?;
        let registry = ProviderRegistry::new(self.providers)?;
        if registry.is_empty() {
            return Err(TrackingError::InvalidArg(
                "no tracking providers available".into(),
            ));
        }

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let health = HealthBook::new(
            registry.list(None),
            self.cfg.circuit_breaker,
            self.cfg.routing,
            Arc::clone(&clock),
            self.seed,
        );
        let cache = Arc::new(ResponseCache::new(self.cfg.cache.clone(), Arc::clone(&clock)));
        let sweeper = tokio::runtime::Handle::try_current()
            .is_ok()
            .then(|| ResponseCache::spawn_sweeper(&cache));
        let rng = self
            .seed
            .map_or_else(StdRng::from_os_rng, |s| StdRng::seed_from_u64(s.rotate_left(17)));

        #[cfg(feature = "tracing")]
        tracing::info!(
            providers = registry.len(),
            sweeper = sweeper.is_some(),
            "tidewatch engine built"
        );

        Ok(Tidewatch {
            inner: Arc::new(Engine {
                registry,
                router: RoutingEngine::new(Arc::new(health)),
                cache,
                batches: BatchQueues::default(),
                cfg: self.cfg,
                clock,
                rng: Mutex::new(rng),
                sweeper,
            }),
        })
    }
}

impl Tidewatch {
    /// Start building a new engine.
    #[must_use]
    pub fn builder() -> TidewatchBuilder {
        TidewatchBuilder::new()
    }

    /// Registered providers.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.inner.registry
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.cfg
    }

    /// Provider order and fallback strategy for `ctx`, over every registered provider.
    pub fn analyze_routing(&self, ctx: &RoutingContext) -> RoutingDecision {
        let eligible = self.inner.registry.list(Some(ctx.kind));
        self.inner.router.analyze_routing(ctx, &eligible)
    }

    /// Query providers for `number` in routing order and collect their answers.
    ///
    /// A fresh cache entry short-circuits the whole lookup. Otherwise providers are
    /// called one at a time; each call first passes admission control (denials are
    /// recorded as rate-limit results without contacting the provider), then runs
    /// under the provider's timeout, retrying timeouts and network errors within
    /// its retry budget. The loop stops at the first success above the early-stop
    /// reliability or one that satisfies the fallback strategy.
    ///
    /// The returned vector holds every attempt's result, errors included.
    ///
    /// # Errors
    /// - `InvalidArg` for an empty tracking number;
    /// - `Unsupported` when no provider serves the kind;
    /// - `Degraded` when no provider produced usable data.
    pub async fn fetch_from_multiple_sources(
        &self,
        number: &str,
        kind: Option<TrackingKind>,
        caller_tier: Option<CallerTier>,
        cost_optimization: bool,
    ) -> Result<Vec<RawResult>, TrackingError> {
        let lookup = Lookup::new(number, kind, caller_tier, cost_optimization)?;
        self.inner.fetch(&lookup).await
    }

    /// Look `number` up with default options and merge the answers.
    ///
    /// # Errors
    /// Same as [`Tidewatch::fetch_from_multiple_sources`].
    pub async fn track(
        &self,
        number: &str,
        kind: Option<TrackingKind>,
    ) -> Result<MergedShipment, TrackingError> {
        let results = self
            .fetch_from_multiple_sources(number, kind, None, false)
            .await?;
        prioritize_data_sources(&results)
    }
}

impl Engine {
    /// Wrap a provider future with a timeout and standardized timeout error mapping.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tidewatch::core::provider_call_with_timeout",
            skip(fut),
            fields(
                timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ),
        )
    )]
    pub(crate) async fn provider_call_with_timeout<T, Fut>(
        provider: &str,
        timeout: Duration,
        fut: Fut,
    ) -> Result<T, TrackingError>
    where
        Fut: core::future::Future<Output = Result<T, TrackingError>>,
    {
        (tokio::time::timeout(timeout, fut).await)
            .unwrap_or_else(|_| Err(TrackingError::timeout(provider, timeout)))
    }

    pub(crate) fn top_choice(&self, lookup: &Lookup) -> Option<String> {
        let eligible = self.registry.list(Some(lookup.kind));
        self.router.top_choice(&lookup.routing_context(), &eligible)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        retry_delay(&self.cfg.backoff, attempt, &mut *rng)
    }

    /// One provider, including admission and retries. Returns `None` only if the
    /// provider vanished from the registry.
    async fn attempt(&self, desc: &ProviderDescriptor, lookup: &Lookup) -> Option<RawResult> {
        let adapter = self.registry.adapter(&desc.name)?;
        let health = self.router.health();
        let mut retry = 0u32;
        loop {
            // Held across the call: if this future is dropped first, a claimed
            // half-open trial slot goes back to the breaker.
            let admission = match health.check_admission(&desc.name) {
                Ok(admission) => admission,
                Err(denied) => {
                    return Some(RawResult::from_response(
                        desc.name.clone(),
                        lookup.number.clone(),
                        desc.reliability,
                        self.clock.utc_now(),
                        Err(denied),
                    ));
                }
            };

            let response = Self::provider_call_with_timeout(
                &desc.name,
                desc.timeout,
                adapter.track_shipment(&lookup.number, lookup.kind),
            )
            .await;

            match &response {
                Ok(_) => self.router.record_success(&desc.name),
                Err(e) => {
                    self.router.record_failure(&desc.name, e);
                    drop(admission);
                    if e.is_retryable() && retry < desc.retries {
                        retry += 1;
                        let wait = self.backoff(retry);
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            provider = %desc.name,
                            attempt = retry,
                            wait_ms = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX),
                            error = %e,
                            "retrying transient provider failure"
                        );
                        tokio::time::sleep(wait).await;
                        continue;
                    }
                }
            }

            return Some(RawResult::from_response(
                desc.name.clone(),
                lookup.number.clone(),
                desc.reliability,
                self.clock.utc_now(),
                response,
            ));
        }
    }

    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "tidewatch::core::fetch",
            skip(self, lookup),
            fields(number = %lookup.number, kind = lookup.kind.as_str()),
        )
    )]
    pub(crate) async fn fetch(&self, lookup: &Lookup) -> Result<Vec<RawResult>, TrackingError> {
        let key = lookup.cache_key();
        if !lookup.force_fresh
            && !lookup.cache_checked
            && let Some(hit) = self.cache.get(&key).await
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(results = hit.len(), "served from cache");
            return Ok(hit);
        }

        let eligible = self.registry.list(Some(lookup.kind));
        if eligible.is_empty() {
            return Err(TrackingError::Unsupported {
                kind: lookup.kind.as_str().to_string(),
            });
        }
        let decision = self
            .router
            .analyze_routing(&lookup.routing_context(), &eligible);
        let strategy = decision.fallback_strategy;

        let mut results: Vec<RawResult> = Vec::new();
        for name in &decision.prioritized_providers {
            let Some(desc) = self.registry.get(name) else {
                continue;
            };
            let Some(result) = self.attempt(desc, lookup).await else {
                continue;
            };
            let usable = result.is_usable();
            let stop = result.is_success()
                && (result.reliability > self.cfg.routing.early_stop_reliability
                    || strategy.is_satisfied_by(result.reliability));
            results.push(result);

            if usable {
                self.cache.put(key.clone(), results.clone()).await;
            }
            if stop {
                #[cfg(feature = "tracing")]
                tracing::debug!(provider = %name, %strategy, "early stop");
                break;
            }
        }

        if results.iter().any(RawResult::is_usable) {
            return Ok(results);
        }

        let errors: Vec<TrackingError> = results
            .into_iter()
            .filter_map(|r| match r.outcome {
                tidewatch_core::RawOutcome::Error(e) => Some(e),
                _ => None,
            })
            .collect();
        let degraded = degrade(&lookup.number, errors);
        #[cfg(feature = "tracing")]
        tracing::info!(error = %degraded, "no provider produced usable data");
        Err(degraded)
    }
}
