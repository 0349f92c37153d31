use std::time::Duration;

use rand::Rng;
use tidewatch_types::BackoffConfig;

/// Add up to `jitter_percent` of `base_ms` as random jitter.
pub fn jitter_wait<R: Rng>(base_ms: u64, jitter_percent: u32, rng: &mut R) -> u64 {
    let jitter_range = if jitter_percent == 0 {
        1
    } else {
        std::cmp::max(1, (base_ms.saturating_mul(u64::from(jitter_percent))) / 100)
    };
    base_ms + rng.random_range(0..jitter_range)
}

/// Delay before retry number `attempt` (1-based) of a transient failure.
pub fn retry_delay<R: Rng>(cfg: &BackoffConfig, attempt: u32, rng: &mut R) -> Duration {
    let factor = u64::from(cfg.factor.max(1));
    let exp = factor.saturating_pow(attempt.saturating_sub(1));
    let base = cfg
        .min_backoff_ms
        .saturating_mul(exp)
        .min(cfg.max_backoff_ms.max(cfg.min_backoff_ms));
    Duration::from_millis(jitter_wait(base, u32::from(cfg.jitter_percent), rng))
}
