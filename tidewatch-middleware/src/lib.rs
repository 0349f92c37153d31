#![doc = include_str!("../README.md")]
//! tidewatch-middleware
//!
//! Admission control and caching wrapped around every provider call.

mod backoff;
mod cache;
mod circuit;
mod health;
mod rate_limit;

pub use crate::backoff::{jitter_wait, retry_delay};
pub use crate::cache::{CacheKey, EntryInfo, ResponseCache, compute_ttl};
pub use crate::circuit::{CircuitBreaker, Refusal};
pub use crate::health::{Admission, HealthBook};
pub use crate::rate_limit::RateWindow;
