//! Adaptive-TTL response cache.
//!
//! Entries are keyed by `(tracking number, kind)` and hold the provider results of
//! one lookup. Each entry's TTL is derived from the best result it holds:
//!
//! ```text
//! ttl = base × reliability factor × freshness factor × status factor
//! ```
//!
//! clamped to `[min_ttl, max_ttl]`.

use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use lru::LruCache;
use tidewatch_core::{Clock, RawResult, ShipmentStatus};
use tidewatch_types::{CacheConfig, CacheStats, TrackingKind};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Identity of a cached lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Normalised tracking number.
    pub number: String,
    /// Kind of the number.
    pub kind: TrackingKind,
}

impl CacheKey {
    /// Build a key.
    pub fn new(number: impl Into<String>, kind: TrackingKind) -> Self {
        Self {
            number: number.into(),
            kind,
        }
    }
}

struct Entry {
    results: Vec<RawResult>,
    ttl: Duration,
    inserted_at: Instant,
    access_count: u64,
    last_access: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.inserted_at) >= self.ttl
    }
}

/// Snapshot of one cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryInfo {
    /// TTL assigned at insertion.
    pub ttl: Duration,
    /// Time since insertion.
    pub age: Duration,
    /// Hits served from this entry.
    pub access_count: u64,
    /// Time since the entry was last read or written.
    pub idle: Duration,
}

#[derive(Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

struct Store {
    lru: LruCache<CacheKey, Entry>,
    counters: Counters,
}

/// TTL for a result of `reliability` and `status`, whose data is `age` old.
#[must_use]
pub fn compute_ttl(
    config: &CacheConfig,
    reliability: f64,
    age: Duration,
    status: ShipmentStatus,
) -> Duration {
    let reliability_factor = if reliability > 0.9 {
        1.5
    } else if reliability > 0.8 {
        1.2
    } else {
        1.0
    };
    let freshness_factor = if age < Duration::from_secs(60) {
        1.3
    } else if age < Duration::from_secs(5 * 60) {
        1.1
    } else {
        0.8
    };
    let status_factor = match status {
        ShipmentStatus::Delivered => 2.0,
        ShipmentStatus::InTransit => 0.8,
        _ => 1.0,
    };
    let raw = config
        .base_ttl
        .mul_f64(reliability_factor * freshness_factor * status_factor);
    let (min, max) = config.ttl_bounds();
    raw.clamp(min, max)
}

/// Age of `result`'s data at `now`, measured from the provider's own refresh time
/// when it reports one.
fn data_age(result: &RawResult, now: DateTime<Utc>) -> Duration {
    let observed = result
        .payload()
        .and_then(|p| p.observed_at)
        .unwrap_or(result.fetched_at);
    (now - observed).to_std().unwrap_or(Duration::ZERO)
}

/// LRU response cache with adaptive TTLs.
pub struct ResponseCache {
    inner: Mutex<Store>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ResponseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ResponseCache {
    /// Empty cache.
    pub fn new(config: CacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(Store {
                lru: LruCache::unbounded(),
                counters: Counters::default(),
            }),
            config,
            clock,
        }
    }

    /// Configuration in use.
    pub const fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up `key`. Expired entries are dropped and count as misses.
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<RawResult>> {
        let now = self.clock.now();
        let mut store = self.inner.lock().await;

        let expired = store.lru.peek(key).map(|e| e.is_expired(now));
        match expired {
            None => {
                store.counters.misses += 1;
                None
            }
            Some(true) => {
                store.lru.pop(key);
                store.counters.expirations += 1;
                store.counters.misses += 1;
                None
            }
            Some(false) => {
                store.counters.hits += 1;
                let entry = store.lru.get_mut(key)?;
                entry.access_count += 1;
                entry.last_access = now;
                Some(entry.results.clone())
            }
        }
    }

    /// Store `results` under `key`.
    ///
    /// The TTL is computed from the highest-reliability usable result. Sets with no
    /// usable result are not cached. Returns the TTL used.
    pub async fn put(&self, key: CacheKey, results: Vec<RawResult>) -> Option<Duration> {
        let best = results
            .iter()
            .filter(|r| r.is_usable())
            .max_by(|a, b| a.reliability.total_cmp(&b.reliability))?;
        let status = best.payload()?.status;
        let age = data_age(best, self.clock.utc_now());
        let ttl = compute_ttl(&self.config, best.reliability, age, status);

        let now = self.clock.now();
        let mut store = self.inner.lock().await;
        let max = self.config.max_entries.max(1);
        if !store.lru.contains(&key) && store.lru.len() >= max {
            let evicted = evict_lru_locked(&mut store, self.config.eviction_fraction);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                evicted = evicted,
                "cache full; evicted least recently accessed entries"
            );
            #[cfg(not(feature = "tracing"))]
            let _ = evicted;
        }
        let access_count = store.lru.peek(&key).map_or(0, |e| e.access_count);
        store.lru.put(
            key,
            Entry {
                results,
                ttl,
                inserted_at: now,
                access_count,
                last_access: now,
            },
        );
        Some(ttl)
    }

    /// Inspect `key` without touching recency or counters.
    pub async fn entry_info(&self, key: &CacheKey) -> Option<EntryInfo> {
        let now = self.clock.now();
        let store = self.inner.lock().await;
        store.lru.peek(key).map(|e| EntryInfo {
            ttl: e.ttl,
            age: now.saturating_duration_since(e.inserted_at),
            access_count: e.access_count,
            idle: now.saturating_duration_since(e.last_access),
        })
    }

    /// Drop every expired entry. Returns how many were dropped.
    pub async fn evict_expired(&self) -> usize {
        let now = self.clock.now();
        let mut store = self.inner.lock().await;
        let expired: Vec<CacheKey> = store
            .lru
            .iter()
            .filter(|(_, e)| e.is_expired(now))
            .map(|(k, _)| k.clone())
            .collect();
        for k in &expired {
            store.lru.pop(k);
        }
        store.counters.expirations += expired.len() as u64;
        #[cfg(feature = "tracing")]
        if !expired.is_empty() {
            tracing::debug!(
                expired = expired.len(),
                "swept expired entries"
            );
        }
        expired.len()
    }

    /// Drop the least recently accessed `fraction` of entries (at least one when
    /// non-empty). Returns how many were dropped.
    pub async fn evict_lru(&self, fraction: f64) -> usize {
        let mut store = self.inner.lock().await;
        evict_lru_locked(&mut store, fraction)
    }

    /// Counters and current size.
    pub async fn stats(&self) -> CacheStats {
        let store = self.inner.lock().await;
        let c = &store.counters;
        let lookups = c.hits + c.misses;
        #[allow(clippy::cast_precision_loss)]
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            c.hits as f64 / lookups as f64
        };
        CacheStats {
            entries: store.lru.len(),
            capacity: self.config.max_entries,
            hits: c.hits,
            misses: c.misses,
            evictions: c.evictions,
            expirations: c.expirations,
            hit_rate,
        }
    }

    /// Drop every entry and zero the counters.
    pub async fn clear(&self) {
        let mut store = self.inner.lock().await;
        store.lru.clear();
        store.counters = Counters::default();
    }

    /// Spawn the periodic expiry sweep.
    ///
    /// The task holds only a weak reference and exits once the cache is dropped.
    pub fn spawn_sweeper(cache: &Arc<Self>) -> JoinHandle<()> {
        let weak: Weak<Self> = Arc::downgrade(cache);
        let period = cache.config.sweep_interval.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(cache) = weak.upgrade() else { break };
                cache.evict_expired().await;
            }
        })
    }
}

fn evict_lru_locked(store: &mut Store, fraction: f64) -> usize {
    let len = store.lru.len();
    if len == 0 {
        return 0;
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let n = ((len as f64) * fraction.clamp(0.0, 1.0)).ceil() as usize;
    let n = n.clamp(1, len);
    for _ in 0..n {
        store.lru.pop_lru();
    }
    store.counters.evictions += n as u64;
    n
}
