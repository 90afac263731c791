//! Read-through caching in front of a [`ContentStore`].
//!
//! Every read builds a [`CacheKey`], answers from the [`CacheStore`] when the
//! key is present, and otherwise asks the next store and populates the cache
//! before returning. Writes go straight to the next store.
//!
//! Concurrent misses on the same key are not coalesced: each caller fetches
//! from the next store and the last `put` wins with an identical value.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, trace, warn};

use crate::application::pagination::PageRequest;
use crate::application::repos::{ArticlePage, ContentStore, RepoError};
use crate::domain::articles::ArticleInput;
use crate::domain::entities::ArticleRecord;

use super::keys::CacheKey;
use super::store::{CacheError, CacheStore};

/// What the decorator does to the cache after a successful write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvalidationPolicy {
    /// Leave cached reads in place; they age out through the store's TTL.
    #[default]
    Never,
    /// Flush the cache namespace after every write that returned `true`.
    FlushNamespace,
}

/// A [`ContentStore`] that reads through a [`CacheStore`].
pub struct CachingContentStore {
    next: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheStore>,
    invalidation: InvalidationPolicy,
}

impl CachingContentStore {
    pub fn new(next: Arc<dyn ContentStore>, cache: Arc<dyn CacheStore>) -> Self {
        Self {
            next,
            cache,
            invalidation: InvalidationPolicy::Never,
        }
    }

    pub fn with_invalidation(mut self, policy: InvalidationPolicy) -> Self {
        self.invalidation = policy;
        self
    }

    async fn read_through<T, F>(&self, key: CacheKey, fetch: F) -> Result<T, RepoError>
    where
        T: Serialize + DeserializeOwned + Send,
        F: Future<Output = Result<T, RepoError>> + Send,
    {
        let scope = key.scope();
        let cache_key = key.build();

        if self.cache.has(&cache_key).await? {
            // The entry may expire between `has` and `get`; that falls through to a miss.
            if let Some(payload) = self.cache.get(&cache_key).await? {
                counter!("penna_cache_hit_total", "scope" => scope).increment(1);
                trace!(scope, key = %cache_key, outcome = "hit", "content cache");
                return decode(&cache_key, &payload);
            }
        }

        counter!("penna_cache_miss_total", "scope" => scope).increment(1);
        debug!(scope, key = %cache_key, outcome = "miss", "content cache");

        let value = fetch.await?;
        let payload = encode(&cache_key, &value)?;
        self.cache.put(&cache_key, payload, None).await?;
        counter!("penna_cache_put_total", "scope" => scope).increment(1);

        Ok(value)
    }

    /// Flushes after a committed write when the policy asks for it. A failed
    /// flush is only logged: the write has already landed.
    async fn after_write(&self, operation: &'static str, written: bool) {
        if !written || self.invalidation != InvalidationPolicy::FlushNamespace {
            return;
        }
        debug!(
            operation,
            namespace = self.cache.namespace(),
            "flushing content cache after write"
        );
        if let Err(err) = self.cache.flush().await {
            warn!(
                operation,
                namespace = self.cache.namespace(),
                error = %err,
                "content cache flush failed after committed write; entries stay until they expire"
            );
        }
    }
}

#[async_trait]
impl ContentStore for CachingContentStore {
    async fn by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        self.read_through(CacheKey::by_id(id), self.next.by_id(id))
            .await
    }

    async fn by_page(
        &self,
        page: PageRequest,
        include_unpublished: bool,
    ) -> Result<ArticlePage, RepoError> {
        self.read_through(
            CacheKey::by_page(page, include_unpublished),
            self.next.by_page(page, include_unpublished),
        )
        .await
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        self.read_through(CacheKey::by_slug(slug), self.next.by_slug(slug))
            .await
    }

    async fn by_tag(&self, tag_slug: &str, page: PageRequest) -> Result<ArticlePage, RepoError> {
        self.read_through(
            CacheKey::by_tag(tag_slug, page),
            self.next.by_tag(tag_slug, page),
        )
        .await
    }

    async fn create(&self, input: ArticleInput) -> Result<bool, RepoError> {
        let created = self.next.create(input).await?;
        self.after_write("create", created).await;
        Ok(created)
    }

    async fn update(&self, input: ArticleInput) -> Result<bool, RepoError> {
        let updated = self.next.update(input).await?;
        self.after_write("update", updated).await;
        Ok(updated)
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<Bytes, CacheError> {
    serde_json::to_vec(value)
        .map(Bytes::from)
        .map_err(|err| CacheError::codec(key, err))
}

fn decode<T: DeserializeOwned>(key: &str, payload: &Bytes) -> Result<T, RepoError> {
    serde_json::from_slice(payload).map_err(|err| CacheError::codec(key, err).into())
}
