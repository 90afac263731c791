use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};
use time::OffsetDateTime;
use tracing::debug;

use crate::application::pagination::{PageRequest, PaginationEnvelope};
use crate::application::repos::{ArticlePage, ContentStore, RepoError, StatusStore};
use crate::domain::articles::{ArticleInput, TagName, ValidArticle};
use crate::domain::entities::{ArticleRecord, TagRecord};

use super::map_sqlx_error;
use super::statuses::PostgresStatusStore;

const SOURCE: &str = "infra::db::articles";

const ARTICLE_COLUMNS: &str = "a.id, a.author_id, a.status_id, a.title, a.slug, a.excerpt, \
     a.body, a.created_at, a.updated_at, a.deleted_at";

#[derive(sqlx::FromRow)]
struct ArticleRow {
    id: i64,
    author_id: i64,
    status_id: i64,
    title: String,
    slug: String,
    excerpt: String,
    body: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
    deleted_at: Option<OffsetDateTime>,
}

impl ArticleRow {
    fn into_record(self, tags: Vec<TagRecord>) -> ArticleRecord {
        ArticleRecord {
            id: self.id,
            author_id: self.author_id,
            status_id: self.status_id,
            title: self.title,
            slug: self.slug,
            excerpt: self.excerpt,
            body: self.body,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
            tags,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ArticleTagRow {
    article_id: i64,
    id: i64,
    name: String,
    slug: String,
}

#[derive(Clone)]
pub struct PostgresContentStore {
    pool: PgPool,
    statuses: PostgresStatusStore,
}

impl PostgresContentStore {
    pub fn new(pool: PgPool, statuses: PostgresStatusStore) -> Self {
        Self { pool, statuses }
    }

    async fn load_tags(
        &self,
        article_ids: &[i64],
    ) -> Result<HashMap<i64, Vec<TagRecord>>, RepoError> {
        if article_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, ArticleTagRow>(
            r#"
            SELECT at.article_id, t.id, t.name, t.slug
            FROM articles_tags at
            INNER JOIN tags t ON t.id = at.tag_id
            WHERE at.article_id = ANY($1)
            ORDER BY t.id
            "#,
        )
        .bind(article_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let mut by_article: HashMap<i64, Vec<TagRecord>> = HashMap::new();
        for row in rows {
            by_article.entry(row.article_id).or_default().push(TagRecord {
                id: row.id,
                name: row.name,
                slug: row.slug,
            });
        }
        Ok(by_article)
    }

    async fn hydrate(&self, rows: Vec<ArticleRow>) -> Result<Vec<ArticleRecord>, RepoError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
        let mut tags = self.load_tags(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let article_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_record(article_tags)
            })
            .collect())
    }

    async fn checked(
        &self,
        input: &ArticleInput,
        op: &'static str,
    ) -> Result<Option<ValidArticle>, RepoError> {
        let valid = match input.validate() {
            Ok(valid) => valid,
            Err(err) => {
                debug!(target = SOURCE, op, error = %err, "article write rejected");
                return Ok(None);
            }
        };
        if self.statuses.by_id(valid.status_id).await?.is_none() {
            debug!(
                target = SOURCE,
                op,
                status_id = valid.status_id,
                "article write rejected: unknown status"
            );
            return Ok(None);
        }
        Ok(Some(valid))
    }

    async fn listing(
        &self,
        page: PageRequest,
        status_id: Option<i64>,
        tag_id: Option<i64>,
    ) -> Result<ArticlePage, RepoError> {
        const FILTER: &str = "a.deleted_at IS NULL \
             AND ($1::BIGINT IS NULL OR a.status_id = $1) \
             AND ($2::BIGINT IS NULL OR EXISTS ( \
                 SELECT 1 FROM articles_tags at WHERE at.article_id = a.id AND at.tag_id = $2))";

        let count_sql = format!("SELECT COUNT(*) FROM articles a WHERE {FILTER}");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(status_id)
            .bind(tag_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let rows = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE {FILTER} \
             ORDER BY a.created_at DESC, a.id DESC LIMIT $3 OFFSET $4"
        ))
        .bind(status_id)
        .bind(tag_id)
        .bind(i64::from(page.limit()))
        .bind(offset_param(page)?)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let total = u64::try_from(total)
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))?;
        let items = self.hydrate(rows).await?;
        Ok(PaginationEnvelope::new(page, total, items))
    }
}

fn offset_param(page: PageRequest) -> Result<i64, RepoError> {
    i64::try_from(page.offset())
        .map_err(|_| RepoError::from_persistence("offset exceeds supported range"))
}

/// Replaces the article's tag links, creating missing tags by slug.
async fn sync_tags(
    tx: &mut Transaction<'_, Postgres>,
    article_id: i64,
    tags: &[TagName],
) -> Result<(), RepoError> {
    sqlx::query("DELETE FROM articles_tags WHERE article_id = $1")
        .bind(article_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

    for tag in tags {
        let tag_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (slug) DO UPDATE SET slug = EXCLUDED.slug
            RETURNING id
            "#,
        )
        .bind(&tag.name)
        .bind(&tag.slug)
        .fetch_one(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;

        sqlx::query(
            "INSERT INTO articles_tags (article_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(article_id)
        .bind(tag_id)
        .execute(&mut **tx)
        .await
        .map_err(map_sqlx_error)?;
    }
    Ok(())
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a WHERE a.id = $1 AND a.deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn by_page(
        &self,
        page: PageRequest,
        include_unpublished: bool,
    ) -> Result<ArticlePage, RepoError> {
        let status_id = if include_unpublished {
            None
        } else {
            Some(self.statuses.published().await?.id)
        };
        self.listing(page, status_id, None).await
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let published = self.statuses.published().await?;
        let row = sqlx::query_as::<_, ArticleRow>(&format!(
            "SELECT {ARTICLE_COLUMNS} FROM articles a \
             WHERE a.slug = $1 AND a.status_id = $2 AND a.deleted_at IS NULL"
        ))
        .bind(slug)
        .bind(published.id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn by_tag(&self, tag_slug: &str, page: PageRequest) -> Result<ArticlePage, RepoError> {
        let published = self.statuses.published().await?;
        let tag_id: Option<i64> = sqlx::query_scalar("SELECT id FROM tags WHERE slug = $1")
            .bind(tag_slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(tag_id) = tag_id else {
            return Ok(PaginationEnvelope::empty(page));
        };
        self.listing(page, Some(published.id), Some(tag_id)).await
    }

    async fn create(&self, input: ArticleInput) -> Result<bool, RepoError> {
        let Some(valid) = self.checked(&input, "create").await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let inserted: Option<i64> = sqlx::query_scalar(
            r#"
            INSERT INTO articles (author_id, status_id, title, slug, excerpt, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (slug) DO NOTHING
            RETURNING id
            "#,
        )
        .bind(valid.author_id)
        .bind(valid.status_id)
        .bind(&valid.title)
        .bind(&valid.slug)
        .bind(&valid.excerpt)
        .bind(&valid.body)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let Some(article_id) = inserted else {
            debug!(target = SOURCE, slug = %valid.slug, "article create rejected: slug taken");
            return Ok(false);
        };

        sync_tags(&mut tx, article_id, &valid.tags).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(target = SOURCE, article_id, "article created");
        Ok(true)
    }

    async fn update(&self, input: ArticleInput) -> Result<bool, RepoError> {
        let Some(id) = input.id else {
            debug!(target = SOURCE, "article update rejected: missing id");
            return Ok(false);
        };
        let Some(valid) = self.checked(&input, "update").await? else {
            return Ok(false);
        };

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let updated = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE articles
            SET author_id = $2, status_id = $3, title = $4, slug = $5,
                excerpt = $6, body = $7, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING id
            "#,
        )
        .bind(id)
        .bind(valid.author_id)
        .bind(valid.status_id)
        .bind(&valid.title)
        .bind(&valid.slug)
        .bind(&valid.excerpt)
        .bind(&valid.body)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error);

        match updated {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(target = SOURCE, article_id = id, "article update rejected: not found");
                return Ok(false);
            }
            Err(RepoError::Duplicate { constraint }) => {
                debug!(
                    target = SOURCE,
                    article_id = id,
                    constraint = %constraint,
                    "article update rejected: slug taken"
                );
                return Ok(false);
            }
            Err(err) => return Err(err),
        }

        sync_tags(&mut tx, id, &valid.tags).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        debug!(target = SOURCE, article_id = id, "article updated");
        Ok(true)
    }
}
