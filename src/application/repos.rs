//! Repository traits describing persistence adapters.
//!
//! [`ContentStore`] is the seam the cache decorator sits on: the concrete
//! stores and [`crate::cache::CachingContentStore`] all implement it, so any
//! number of decorators can be stacked in front of one store.

use async_trait::async_trait;
use thiserror::Error;

use crate::application::pagination::{PageRequest, PaginationEnvelope, PaginationError};
use crate::cache::CacheError;
use crate::domain::articles::ArticleInput;
use crate::domain::entities::{ArticleRecord, StatusRecord};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
    #[error(transparent)]
    Pagination(#[from] PaginationError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

pub type ArticlePage = PaginationEnvelope<ArticleRecord>;

/// Data access for articles.
///
/// Absence is `Ok(None)` or an empty envelope, a rejected write is `Ok(false)`,
/// and only dependency failures surface as `Err`.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Any non-deleted article, regardless of status.
    async fn by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError>;

    /// Most-recent-first page. Drafts take part in both items and total only
    /// when `include_unpublished` is set.
    async fn by_page(
        &self,
        page: PageRequest,
        include_unpublished: bool,
    ) -> Result<ArticlePage, RepoError>;

    /// A published article by slug.
    async fn by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError>;

    /// Published articles carrying the tag. An unknown tag yields an empty page.
    async fn by_tag(&self, tag_slug: &str, page: PageRequest) -> Result<ArticlePage, RepoError>;

    async fn create(&self, input: ArticleInput) -> Result<bool, RepoError>;

    /// Updates the article named by `input.id` and replaces its tag set.
    async fn update(&self, input: ArticleInput) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn all(&self) -> Result<Vec<StatusRecord>, RepoError>;

    async fn by_id(&self, id: i64) -> Result<Option<StatusRecord>, RepoError>;

    async fn by_slug(&self, slug: &str) -> Result<Option<StatusRecord>, RepoError>;

    /// The publicly visible status. Its absence is an integrity failure.
    async fn published(&self) -> Result<StatusRecord, RepoError> {
        self.by_slug(crate::domain::entities::PUBLISHED_STATUS_SLUG)
            .await?
            .ok_or_else(|| RepoError::Integrity {
                message: "the `published` status is not defined".to_string(),
            })
    }
}
