//! Cache store abstraction and the in-process implementation.
//!
//! A [`CacheStore`] is a namespaced key/value store of opaque payloads with a
//! default time-to-live. [`MemoryCacheStore`] keeps entries in an LRU shared
//! by every namespace created from the same [`MemoryCacheBackend`].

use std::num::NonZeroUsize;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;
use thiserror::Error;

use crate::util::lock::{rw_read, rw_write};

use super::config::CacheConfig;

const SOURCE: &str = "cache::store";
const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
    #[error("cache entry `{key}` could not be encoded or decoded: {message}")]
    Codec { key: String, message: String },
}

impl CacheError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn codec(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Codec {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

/// Key/value capability the cache decorator reads through.
///
/// Implementations synchronize internally; callers never lock around them.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn namespace(&self) -> &str;

    /// TTL applied by [`CacheStore::put`] when none is given.
    fn default_ttl(&self) -> Duration;

    async fn has(&self, key: &str) -> Result<bool, CacheError>;

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError>;

    /// Stores `value` and hands it back.
    async fn put(&self, key: &str, value: Bytes, ttl: Option<Duration>)
    -> Result<Bytes, CacheError>;

    /// Drops every entry in this store's namespace.
    async fn flush(&self) -> Result<(), CacheError>;
}

#[derive(Clone)]
struct Entry {
    value: Bytes,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Process-wide LRU storage shared by namespaced [`MemoryCacheStore`]s.
pub struct MemoryCacheBackend {
    entries: RwLock<LruCache<String, Entry>>,
}

impl MemoryCacheBackend {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    /// Number of stored entries across all namespaces, expired ones included.
    pub fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_entry(&self, key: &str, now: Instant) -> Option<Entry> {
        let mut entries = rw_write(&self.entries, SOURCE, "get");
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }

    fn insert(&self, key: String, entry: Entry) {
        let evicted = rw_write(&self.entries, SOURCE, "put").push(key.clone(), entry);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("penna_cache_evict_total").increment(1);
        }
    }

    fn remove_prefixed(&self, prefix: &str) -> usize {
        let mut entries = rw_write(&self.entries, SOURCE, "flush");
        let doomed: Vec<String> = entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            entries.pop(key);
        }
        doomed.len()
    }
}

/// In-memory [`CacheStore`] scoped to one namespace.
#[derive(Clone)]
pub struct MemoryCacheStore {
    backend: Arc<MemoryCacheBackend>,
    namespace: String,
    prefix: String,
    default_ttl: Duration,
}

impl MemoryCacheStore {
    /// A store with its own backend of `capacity` entries.
    pub fn new(
        namespace: impl Into<String>,
        default_ttl: Duration,
        capacity: NonZeroUsize,
    ) -> Self {
        Self::with_backend(
            Arc::new(MemoryCacheBackend::new(capacity)),
            namespace,
            default_ttl,
        )
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            config.namespace.clone(),
            config.ttl(),
            config.capacity_non_zero(),
        )
    }

    pub fn with_backend(
        backend: Arc<MemoryCacheBackend>,
        namespace: impl Into<String>,
        default_ttl: Duration,
    ) -> Self {
        let namespace = namespace.into();
        // Length-prefixed so no namespace's prefix is a prefix of another's.
        Self {
            backend,
            prefix: format!("{}:{namespace}:", namespace.len()),
            namespace,
            default_ttl,
        }
    }

    pub fn backend(&self) -> &Arc<MemoryCacheBackend> {
        &self.backend
    }

    fn scoped(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self
            .backend
            .live_entry(&self.scoped(key), Instant::now())
            .is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        Ok(self
            .backend
            .live_entry(&self.scoped(key), Instant::now())
            .map(|entry| entry.value))
    }

    async fn put(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<Bytes, CacheError> {
        let ttl = ttl.unwrap_or(self.default_ttl).min(MAX_TTL);
        let expires_at = Instant::now() + ttl;
        self.backend.insert(
            self.scoped(key),
            Entry {
                value: value.clone(),
                expires_at,
            },
        );
        Ok(value)
    }

    async fn flush(&self) -> Result<(), CacheError> {
        let removed = self.backend.remove_prefixed(&self.prefix);
        counter!("penna_cache_flush_total").increment(1);
        tracing::debug!(
            target = SOURCE,
            namespace = %self.namespace,
            removed,
            "flushed cache namespace"
        );
        Ok(())
    }
}
