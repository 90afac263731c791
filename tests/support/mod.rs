#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use penna::application::pagination::PageRequest;
use penna::application::repos::{ArticlePage, ContentStore, RepoError};
use penna::cache::{CacheError, CacheStore, MemoryCacheStore};
use penna::domain::articles::ArticleInput;
use penna::domain::entities::ArticleRecord;
use penna::infra::memory::{MemoryContentStore, MemoryStatusStore};

pub const PUBLISHED: i64 = 1;
pub const DRAFT: i64 = 2;

pub fn memory_store() -> Arc<MemoryContentStore> {
    Arc::new(MemoryContentStore::new(Arc::new(
        MemoryStatusStore::default(),
    )))
}

pub fn memory_cache(namespace: &str) -> Arc<MemoryCacheStore> {
    Arc::new(MemoryCacheStore::new(
        namespace,
        Duration::from_secs(600),
        std::num::NonZeroUsize::new(1000).expect("non-zero capacity"),
    ))
}

pub fn article_input(title: &str, status_id: i64, tags: &[&str]) -> ArticleInput {
    ArticleInput {
        author_id: Some(1),
        status_id: Some(status_id),
        title: Some(title.to_string()),
        excerpt: Some(format!("About {title}")),
        body: Some(format!("# {title}\n\nBody text.")),
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
        ..ArticleInput::default()
    }
}

/// Creates `count` published articles tagged `rust`, titled `Article 1..=count`.
pub async fn seed_published(store: &dyn ContentStore, count: usize) {
    for n in 1..=count {
        let created = store
            .create(article_input(&format!("Article {n}"), PUBLISHED, &["Rust"]))
            .await
            .expect("create article");
        assert!(created, "article {n} should be created");
    }
}

/// Forwards to another store and counts calls per operation.
pub struct CountingStore {
    inner: Arc<dyn ContentStore>,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: Arc<dyn ContentStore>) -> Self {
        Self {
            inner,
            reads: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for CountingStore {
    async fn by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.by_id(id).await
    }

    async fn by_page(
        &self,
        page: PageRequest,
        include_unpublished: bool,
    ) -> Result<ArticlePage, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.by_page(page, include_unpublished).await
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.by_slug(slug).await
    }

    async fn by_tag(&self, tag_slug: &str, page: PageRequest) -> Result<ArticlePage, RepoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.by_tag(tag_slug, page).await
    }

    async fn create(&self, input: ArticleInput) -> Result<bool, RepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.create(input).await
    }

    async fn update(&self, input: ArticleInput) -> Result<bool, RepoError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.update(input).await
    }
}

/// Forwards to a [`MemoryCacheStore`] and counts puts and flushes.
pub struct CountingCache {
    inner: Arc<MemoryCacheStore>,
    pub puts: AtomicUsize,
    pub flushes: AtomicUsize,
}

impl CountingCache {
    pub fn new(inner: Arc<MemoryCacheStore>) -> Self {
        Self {
            inner,
            puts: AtomicUsize::new(0),
            flushes: AtomicUsize::new(0),
        }
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CacheStore for CountingCache {
    fn namespace(&self) -> &str {
        self.inner.namespace()
    }

    fn default_ttl(&self) -> Duration {
        self.inner.default_ttl()
    }

    async fn has(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.has(key).await
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheError> {
        self.inner.get(key).await
    }

    async fn put(
        &self,
        key: &str,
        value: Bytes,
        ttl: Option<Duration>,
    ) -> Result<Bytes, CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(key, value, ttl).await
    }

    async fn flush(&self) -> Result<(), CacheError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

/// A cache whose every operation fails, as if the backing service were down.
pub struct UnavailableCache;

#[async_trait]
impl CacheStore for UnavailableCache {
    fn namespace(&self) -> &str {
        "articles"
    }

    fn default_ttl(&self) -> Duration {
        Duration::from_secs(600)
    }

    async fn has(&self, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn put(
        &self,
        _key: &str,
        _value: Bytes,
        _ttl: Option<Duration>,
    ) -> Result<Bytes, CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }

    async fn flush(&self) -> Result<(), CacheError> {
        Err(CacheError::unavailable("connection refused"))
    }
}
