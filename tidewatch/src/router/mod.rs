//! Cost- and reliability-aware provider ordering.

pub mod util;

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tidewatch_core::{
    CallerTier, CostTier, FallbackStrategy, ProviderDescriptor, RoutingStats, TrackingError,
    TrackingKind,
};
use tidewatch_middleware::HealthBook;

/// Inputs to one routing decision.
#[derive(Debug, Clone)]
pub struct RoutingContext {
    /// Normalised tracking number.
    pub tracking_number: String,
    /// Kind of the tracking number.
    pub kind: TrackingKind,
    /// Subscription tier of the caller.
    pub caller_tier: CallerTier,
    /// Whether the caller asked for the cheapest route.
    pub cost_optimization: bool,
    /// Providers the caller already knows to be failing.
    pub recent_failures: HashSet<String>,
}

impl RoutingContext {
    /// Context for a standard-tier lookup without cost optimisation.
    pub fn new(tracking_number: impl Into<String>, kind: TrackingKind) -> Self {
        Self {
            tracking_number: tracking_number.into(),
            kind,
            caller_tier: CallerTier::default(),
            cost_optimization: false,
            recent_failures: HashSet::new(),
        }
    }

    /// Set the caller tier.
    #[must_use]
    pub const fn caller_tier(mut self, tier: CallerTier) -> Self {
        self.caller_tier = tier;
        self
    }

    /// Request cost-optimised routing.
    #[must_use]
    pub const fn cost_optimization(mut self, enabled: bool) -> Self {
        self.cost_optimization = enabled;
        self
    }

    /// Mark `provider` as recently failing.
    #[must_use]
    pub fn failing(mut self, provider: impl Into<String>) -> Self {
        self.recent_failures.insert(provider.into());
        self
    }
}

/// Ordered provider list plus the policy for when to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingDecision {
    /// Provider names in call order.
    pub prioritized_providers: Vec<String>,
    /// Human-readable explanation of the order.
    pub reasoning: String,
    /// Early-stop policy for this lookup.
    pub fallback_strategy: FallbackStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Bucket {
    Free,
    HighReliability,
    MediumReliability,
    Freemium,
    Aggregator,
    Other,
}

impl Bucket {
    fn of(d: &ProviderDescriptor) -> Self {
        if d.is_aggregator {
            return Self::Aggregator;
        }
        match d.cost_tier {
            CostTier::Free => Self::Free,
            CostTier::Freemium => Self::Freemium,
            CostTier::Paid | CostTier::Premium if d.reliability >= 0.90 => Self::HighReliability,
            CostTier::Paid | CostTier::Premium if d.reliability >= 0.80 => {
                Self::MediumReliability
            }
            CostTier::Paid | CostTier::Premium => Self::Other,
        }
    }

    const fn label(self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::HighReliability => "high",
            Self::MediumReliability => "medium",
            Self::Freemium => "freemium",
            Self::Aggregator => "aggregator",
            Self::Other => "other",
        }
    }
}

struct Ranked<'a> {
    order: Vec<(&'a ProviderDescriptor, Bucket)>,
    demoted: Vec<&'a str>,
}

/// Orders providers for each lookup and owns the health feedback loop.
#[derive(Debug)]
pub struct RoutingEngine {
    health: Arc<HealthBook>,
    stats: Mutex<RoutingStats>,
}

impl RoutingEngine {
    /// Route against the providers tracked by `health`.
    pub fn new(health: Arc<HealthBook>) -> Self {
        Self {
            health,
            stats: Mutex::new(RoutingStats::default()),
        }
    }

    /// Health book used for admission and failure tracking.
    pub fn health(&self) -> &Arc<HealthBook> {
        &self.health
    }

    /// Fallback strategy implied by the caller.
    #[must_use]
    pub const fn select_strategy(ctx: &RoutingContext) -> FallbackStrategy {
        if ctx.cost_optimization || matches!(ctx.caller_tier, CallerTier::Free) {
            FallbackStrategy::FreeFirst
        } else if matches!(ctx.caller_tier, CallerTier::Premium | CallerTier::Enterprise) {
            FallbackStrategy::ReliabilityFirst
        } else {
            FallbackStrategy::PaidFirst
        }
    }

    fn rank<'a>(&self, ctx: &RoutingContext, eligible: &[&'a ProviderDescriptor]) -> Ranked<'a> {
        let mut order: Vec<(&ProviderDescriptor, Bucket)> = eligible
            .iter()
            .copied()
            .filter(|d| d.kinds.supports(ctx.kind))
            .map(|d| (d, Bucket::of(d)))
            .collect();
        order.sort_by(|(a, ba), (b, bb)| {
            ba.cmp(bb)
                .then_with(|| b.reliability.total_cmp(&a.reliability))
        });

        let failing: HashSet<String> = self
            .health
            .recently_failing()
            .into_iter()
            .chain(ctx.recent_failures.iter().cloned())
            .collect();
        let (healthy, demoted): (Vec<_>, Vec<_>) = order
            .into_iter()
            .partition(|(d, _)| !failing.contains(&d.name));
        let demoted_names = demoted.iter().map(|&(d, _)| d.name.as_str()).collect();
        let mut order = healthy;
        order.extend(demoted);
        Ranked {
            order,
            demoted: demoted_names,
        }
    }

    /// Order `eligible` for `ctx` and pick the fallback strategy.
    ///
    /// Providers are grouped into six buckets (free, paid ≥ 0.90, paid 0.80–0.90,
    /// freemium, aggregators, everything else), each sorted by descending
    /// reliability. Providers that are recently failing, either because the caller
    /// said so or because their health says so, keep their relative order but move
    /// to the tail.
    pub fn analyze_routing(
        &self,
        ctx: &RoutingContext,
        eligible: &[&ProviderDescriptor],
    ) -> RoutingDecision {
        let strategy = Self::select_strategy(ctx);
        let ranked = self.rank(ctx, eligible);

        let order_text = ranked
            .order
            .iter()
            .map(|(d, b)| format!("{}({}, {:.2})", d.name, b.label(), d.reliability))
            .collect::<Vec<_>>()
            .join(" > ");
        let mut reasoning = format!("strategy={strategy}; order: {order_text}");
        if !ranked.demoted.is_empty() {
            reasoning.push_str("; deprioritized after recent failures: ");
            reasoning.push_str(&ranked.demoted.join(", "));
        }

        let prioritized: Vec<String> = ranked.order.iter().map(|(d, _)| d.name.clone()).collect();
        {
            let mut stats = self.stats.lock().unwrap_or_else(PoisonError::into_inner);
            stats.decisions += 1;
            *stats
                .by_strategy
                .entry(strategy.as_str().to_string())
                .or_insert(0) += 1;
            stats.deprioritized += ranked.demoted.len() as u64;
            match prioritized.first() {
                Some(first) => *stats.top_choice.entry(first.clone()).or_insert(0) += 1,
                None => stats.empty += 1,
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            number = %ctx.tracking_number,
            kind = ctx.kind.as_str(),
            %reasoning,
            "routing decision"
        );

        RoutingDecision {
            prioritized_providers: prioritized,
            reasoning,
            fallback_strategy: strategy,
        }
    }

    /// First provider `analyze_routing` would pick, without recording statistics.
    pub fn top_choice(&self, ctx: &RoutingContext, eligible: &[&ProviderDescriptor]) -> Option<String> {
        self.rank(ctx, eligible)
            .order
            .first()
            .map(|(d, _)| d.name.clone())
    }

    /// Successful or partial answer from `provider`.
    pub fn record_success(&self, provider: &str) {
        self.health.record_success(provider);
    }

    /// Failed attempt at `provider`. Rate limits back the provider off without counting as faults.
    pub fn record_failure(&self, provider: &str, err: &TrackingError) {
        self.health.record_failure(provider, err);
    }

    /// Snapshot of routing counters.
    pub fn stats(&self) -> RoutingStats {
        self.stats
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
