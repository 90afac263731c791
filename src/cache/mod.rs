//! Penna content cache.
//!
//! A read-through cache in front of the article [`ContentStore`]:
//!
//! - [`CacheKey`] maps a query's shape to a fixed-length key
//! - [`CacheStore`] is the namespaced key/value capability, with
//!   [`MemoryCacheStore`] as the in-process LRU/TTL implementation
//! - [`CachingContentStore`] is the decorator itself
//! - [`build_article_store`] decides at construction time whether to cache
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! namespace = "articles"
//! ttl_minutes = 10
//! capacity = 1000
//! invalidate_on_write = false
//! admin = false
//! ```
//!
//! [`ContentStore`]: crate::application::repos::ContentStore

mod config;
mod decorator;
mod keys;
mod store;
mod wiring;

pub use config::CacheConfig;
pub(crate) use config::{DEFAULT_CAPACITY, DEFAULT_NAMESPACE, DEFAULT_TTL_MINUTES};
pub use decorator::{CachingContentStore, InvalidationPolicy};
pub use keys::CacheKey;
pub use store::{CacheError, CacheStore, MemoryCacheBackend, MemoryCacheStore};
pub use wiring::{StoreMode, build_article_store};
