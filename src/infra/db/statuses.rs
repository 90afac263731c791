use async_trait::async_trait;
use sqlx::postgres::PgPool;

use crate::application::repos::{RepoError, StatusStore};
use crate::domain::entities::StatusRecord;

use super::map_sqlx_error;

#[derive(sqlx::FromRow)]
struct StatusRow {
    id: i64,
    name: String,
    slug: String,
}

impl From<StatusRow> for StatusRecord {
    fn from(row: StatusRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[derive(Clone)]
pub struct PostgresStatusStore {
    pool: PgPool,
}

impl PostgresStatusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StatusStore for PostgresStatusStore {
    async fn all(&self) -> Result<Vec<StatusRecord>, RepoError> {
        let rows =
            sqlx::query_as::<_, StatusRow>("SELECT id, name, slug FROM statuses ORDER BY id")
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(StatusRecord::from).collect())
    }

    async fn by_id(&self, id: i64) -> Result<Option<StatusRecord>, RepoError> {
        let row =
            sqlx::query_as::<_, StatusRow>("SELECT id, name, slug FROM statuses WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(StatusRecord::from))
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<StatusRecord>, RepoError> {
        let row =
            sqlx::query_as::<_, StatusRow>("SELECT id, name, slug FROM statuses WHERE slug = $1")
                .bind(slug)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(row.map(StatusRecord::from))
    }
}
