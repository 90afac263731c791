//! Cache configuration.
//!
//! Built from the `[cache]` section of `penna.toml` by [`crate::config`].

use std::num::NonZeroUsize;
use std::time::Duration;

use super::decorator::InvalidationPolicy;

pub(crate) const DEFAULT_NAMESPACE: &str = "articles";
pub(crate) const DEFAULT_TTL_MINUTES: u64 = 10;
pub(crate) const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Wrap the public content store in the read-through cache.
    pub enabled: bool,
    /// Namespace the content entries live under.
    pub namespace: String,
    /// Default entry lifetime, in minutes.
    pub ttl_minutes: u64,
    /// Maximum entries in the in-process cache.
    pub capacity: usize,
    /// Flush the namespace after successful writes.
    pub invalidate_on_write: bool,
    /// Serve reads straight from the store, bypassing the cache.
    pub admin: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl_minutes: DEFAULT_TTL_MINUTES,
            capacity: DEFAULT_CAPACITY,
            invalidate_on_write: false,
            admin: false,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_minutes.saturating_mul(60))
    }

    /// Capacity as NonZeroUsize, clamping to 1 if zero.
    pub fn capacity_non_zero(&self) -> NonZeroUsize {
        NonZeroUsize::new(self.capacity).unwrap_or(NonZeroUsize::MIN)
    }

    pub fn invalidation_policy(&self) -> InvalidationPolicy {
        if self.invalidate_on_write {
            InvalidationPolicy::FlushNamespace
        } else {
            InvalidationPolicy::Never
        }
    }
}
