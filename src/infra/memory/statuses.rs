use async_trait::async_trait;

use crate::application::repos::{RepoError, StatusStore};
use crate::domain::entities::{PUBLISHED_STATUS_SLUG, StatusRecord};

/// Fixed status table held in memory.
#[derive(Debug, Clone)]
pub struct MemoryStatusStore {
    statuses: Vec<StatusRecord>,
}

impl MemoryStatusStore {
    pub fn new(statuses: Vec<StatusRecord>) -> Self {
        Self { statuses }
    }
}

impl Default for MemoryStatusStore {
    /// `1 Published` and `2 Draft`, matching the database seed.
    fn default() -> Self {
        Self::new(vec![
            StatusRecord {
                id: 1,
                name: "Published".to_string(),
                slug: PUBLISHED_STATUS_SLUG.to_string(),
            },
            StatusRecord {
                id: 2,
                name: "Draft".to_string(),
                slug: "draft".to_string(),
            },
        ])
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn all(&self) -> Result<Vec<StatusRecord>, RepoError> {
        Ok(self.statuses.clone())
    }

    async fn by_id(&self, id: i64) -> Result<Option<StatusRecord>, RepoError> {
        Ok(self.statuses.iter().find(|status| status.id == id).cloned())
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<StatusRecord>, RepoError> {
        Ok(self
            .statuses
            .iter()
            .find(|status| status.slug == slug)
            .cloned())
    }
}
