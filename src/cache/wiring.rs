//! Construction-time choice between the bare and the cached content store.

use std::sync::Arc;

use tracing::info;

use crate::application::repos::ContentStore;

use super::config::CacheConfig;
use super::decorator::CachingContentStore;
use super::store::CacheStore;

/// Who the store is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Public readers share cached results.
    Public,
    /// Administrators always read through to the store.
    Admin,
}

impl StoreMode {
    pub fn from_admin_flag(admin: bool) -> Self {
        if admin { Self::Admin } else { Self::Public }
    }
}

/// Wrap `inner` in a [`CachingContentStore`] unless the mode or config opts out.
pub fn build_article_store(
    inner: Arc<dyn ContentStore>,
    cache: Arc<dyn CacheStore>,
    config: &CacheConfig,
    mode: StoreMode,
) -> Arc<dyn ContentStore> {
    if mode == StoreMode::Admin || !config.enabled {
        info!(?mode, enabled = config.enabled, "content cache bypassed");
        return inner;
    }

    info!(
        namespace = cache.namespace(),
        ttl_secs = cache.default_ttl().as_secs(),
        invalidation = ?config.invalidation_policy(),
        "content cache enabled"
    );
    Arc::new(
        CachingContentStore::new(inner, cache).with_invalidation(config.invalidation_policy()),
    )
}
