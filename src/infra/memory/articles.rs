use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;
use tracing::debug;

use crate::application::pagination::{PageRequest, PaginationEnvelope};
use crate::application::repos::{ArticlePage, ContentStore, RepoError, StatusStore};
use crate::domain::articles::{ArticleInput, TagName, ValidArticle};
use crate::domain::entities::{ArticleRecord, TagRecord};
use crate::util::lock::{rw_read, rw_write};

const SOURCE: &str = "infra::memory::articles";

#[derive(Default)]
struct MemoryState {
    /// Rows without tags; tags are attached from `article_tags` on read.
    articles: BTreeMap<i64, ArticleRecord>,
    tags: BTreeMap<i64, TagRecord>,
    /// `(article_id, tag_id)` links.
    article_tags: BTreeSet<(i64, i64)>,
    next_article_id: i64,
    next_tag_id: i64,
}

impl MemoryState {
    fn hydrate(&self, row: &ArticleRecord) -> ArticleRecord {
        let mut article = row.clone();
        article.tags = self
            .article_tags
            .range((row.id, i64::MIN)..=(row.id, i64::MAX))
            .filter_map(|(_, tag_id)| self.tags.get(tag_id).cloned())
            .collect();
        article
    }

    fn slug_taken(&self, slug: &str, except: Option<i64>) -> bool {
        self.articles
            .values()
            .any(|row| row.slug == slug && Some(row.id) != except)
    }

    fn tag_id_for(&mut self, tag: &TagName) -> i64 {
        if let Some(existing) = self.tags.values().find(|record| record.slug == tag.slug) {
            return existing.id;
        }
        self.next_tag_id += 1;
        let id = self.next_tag_id;
        self.tags.insert(
            id,
            TagRecord {
                id,
                name: tag.name.clone(),
                slug: tag.slug.clone(),
            },
        );
        id
    }

    fn sync_tags(&mut self, article_id: i64, tags: &[TagName]) {
        self.article_tags
            .retain(|(linked_article, _)| *linked_article != article_id);
        for tag in tags {
            let tag_id = self.tag_id_for(tag);
            self.article_tags.insert((article_id, tag_id));
        }
    }

    /// Live rows passing `filter`, newest first.
    fn listing<F>(&self, request: PageRequest, filter: F) -> ArticlePage
    where
        F: Fn(&ArticleRecord) -> bool,
    {
        let mut rows: Vec<&ArticleRecord> = self
            .articles
            .values()
            .filter(|row| !row.is_deleted() && filter(row))
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = rows.len() as u64;
        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let items = rows
            .into_iter()
            .skip(offset)
            .take(request.limit() as usize)
            .map(|row| self.hydrate(row))
            .collect();
        PaginationEnvelope::new(request, total, items)
    }
}

/// Process-local [`ContentStore`] backed by ordered maps.
///
/// Mirrors the relational layout (articles, tags, link table) so the
/// visibility and tag rules behave like the Postgres adapter.
pub struct MemoryContentStore {
    statuses: Arc<dyn StatusStore>,
    state: RwLock<MemoryState>,
}

impl MemoryContentStore {
    pub fn new(statuses: Arc<dyn StatusStore>) -> Self {
        Self {
            statuses,
            state: RwLock::new(MemoryState::default()),
        }
    }

    /// Marks an article deleted. Returns `false` if it is unknown or already deleted.
    pub fn soft_delete(&self, id: i64) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "soft_delete");
        match state.articles.get_mut(&id) {
            Some(row) if !row.is_deleted() => {
                row.deleted_at = Some(OffsetDateTime::now_utc());
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        rw_read(&self.state, SOURCE, "len")
            .articles
            .values()
            .filter(|row| !row.is_deleted())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
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
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn by_id(&self, id: i64) -> Result<Option<ArticleRecord>, RepoError> {
        let state = rw_read(&self.state, SOURCE, "by_id");
        Ok(state
            .articles
            .get(&id)
            .filter(|row| !row.is_deleted())
            .map(|row| state.hydrate(row)))
    }

    async fn by_page(
        &self,
        page: PageRequest,
        include_unpublished: bool,
    ) -> Result<ArticlePage, RepoError> {
        let published = self.statuses.published().await?;
        let state = rw_read(&self.state, SOURCE, "by_page");
        Ok(state.listing(page, |row| {
            include_unpublished || row.status_id == published.id
        }))
    }

    async fn by_slug(&self, slug: &str) -> Result<Option<ArticleRecord>, RepoError> {
        let published = self.statuses.published().await?;
        let state = rw_read(&self.state, SOURCE, "by_slug");
        Ok(state
            .articles
            .values()
            .find(|row| row.slug == slug && !row.is_deleted() && row.status_id == published.id)
            .map(|row| state.hydrate(row)))
    }

    async fn by_tag(&self, tag_slug: &str, page: PageRequest) -> Result<ArticlePage, RepoError> {
        let published = self.statuses.published().await?;
        let state = rw_read(&self.state, SOURCE, "by_tag");
        let Some(tag_id) = state
            .tags
            .values()
            .find(|tag| tag.slug == tag_slug)
            .map(|tag| tag.id)
        else {
            return Ok(PaginationEnvelope::empty(page));
        };
        Ok(state.listing(page, |row| {
            row.status_id == published.id && state.article_tags.contains(&(row.id, tag_id))
        }))
    }

    async fn create(&self, input: ArticleInput) -> Result<bool, RepoError> {
        let Some(valid) = self.checked(&input, "create").await? else {
            return Ok(false);
        };

        let mut state = rw_write(&self.state, SOURCE, "create");
        if state.slug_taken(&valid.slug, None) {
            debug!(target = SOURCE, slug = %valid.slug, "article create rejected: slug taken");
            return Ok(false);
        }

        state.next_article_id += 1;
        let id = state.next_article_id;
        let now = OffsetDateTime::now_utc();
        state.articles.insert(
            id,
            ArticleRecord {
                id,
                author_id: valid.author_id,
                status_id: valid.status_id,
                title: valid.title,
                slug: valid.slug,
                excerpt: valid.excerpt,
                body: valid.body,
                created_at: now,
                updated_at: now,
                deleted_at: None,
                tags: Vec::new(),
            },
        );
        state.sync_tags(id, &valid.tags);
        debug!(target = SOURCE, article_id = id, "article created");
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

        let mut state = rw_write(&self.state, SOURCE, "update");
        if state.slug_taken(&valid.slug, Some(id)) {
            debug!(
                target = SOURCE,
                article_id = id,
                slug = %valid.slug,
                "article update rejected: slug taken"
            );
            return Ok(false);
        }
        let Some(row) = state.articles.get_mut(&id).filter(|row| !row.is_deleted()) else {
            debug!(target = SOURCE, article_id = id, "article update rejected: not found");
            return Ok(false);
        };

        row.author_id = valid.author_id;
        row.status_id = valid.status_id;
        row.title = valid.title;
        row.slug = valid.slug;
        row.excerpt = valid.excerpt;
        row.body = valid.body;
        row.updated_at = OffsetDateTime::now_utc();
        state.sync_tags(id, &valid.tags);
        debug!(target = SOURCE, article_id = id, "article updated");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::memory::MemoryStatusStore;

    fn store() -> MemoryContentStore {
        MemoryContentStore::new(Arc::new(MemoryStatusStore::default()))
    }

    fn input(title: &str, status_id: i64, tags: &[&str]) -> ArticleInput {
        ArticleInput {
            author_id: Some(1),
            status_id: Some(status_id),
            title: Some(title.to_string()),
            excerpt: Some(format!("{title} excerpt")),
            body: Some(format!("{title} body")),
            tags: tags.iter().map(|tag| tag.to_string()).collect(),
            ..ArticleInput::default()
        }
    }

    #[tokio::test]
    async fn create_assigns_ids_and_links_tags() {
        let store = store();
        assert!(store.create(input("First", 1, &["Rust", "Web"])).await.expect("create"));
        assert!(store.create(input("Second", 1, &["rust"])).await.expect("create"));

        let first = store.by_id(1).await.expect("by id").expect("present");
        assert_eq!(first.slug, "first");
        assert_eq!(first.tags.len(), 2);

        let second = store.by_id(2).await.expect("by id").expect("present");
        assert_eq!(second.tags, vec![first.tags[0].clone()]);
    }

    #[tokio::test]
    async fn create_rejects_invalid_payloads_without_error() {
        let store = store();
        assert!(!store.create(ArticleInput::default()).await.expect("create"));
        assert!(!store.create(input("Ghost status", 9, &["rust"])).await.expect("create"));
        assert!(store.create(input("Taken", 1, &["rust"])).await.expect("create"));
        assert!(!store.create(input("Taken", 1, &["rust"])).await.expect("create"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn listings_hide_drafts_unless_requested() {
        let store = store();
        store.create(input("Public", 1, &["rust"])).await.expect("create");
        store.create(input("Draft", 2, &["rust"])).await.expect("create");

        let request = PageRequest::first(10).expect("request");
        let public = store.by_page(request, false).await.expect("page");
        assert_eq!(public.total_items, 1);
        assert_eq!(public.items[0].slug, "public");

        let all = store.by_page(request, true).await.expect("page");
        assert_eq!(all.total_items, 2);
        assert_eq!(all.items[0].slug, "draft");

        assert!(store.by_slug("draft").await.expect("slug").is_none());
        assert!(store.by_id(2).await.expect("by id").is_some());

        let tagged = store.by_tag("rust", request).await.expect("tag");
        assert_eq!(tagged.total_items, 1);
    }

    #[tokio::test]
    async fn soft_deleted_articles_disappear() {
        let store = store();
        store.create(input("Gone", 1, &["rust"])).await.expect("create");
        assert!(store.soft_delete(1));
        assert!(!store.soft_delete(1));

        assert!(store.by_id(1).await.expect("by id").is_none());
        assert!(store.by_slug("gone").await.expect("slug").is_none());
        let request = PageRequest::first(10).expect("request");
        assert_eq!(store.by_page(request, true).await.expect("page").total_items, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn update_replaces_fields_and_tags() {
        let store = store();
        store.create(input("Original", 1, &["rust", "web"])).await.expect("create");

        let changed = ArticleInput {
            id: Some(1),
            ..input("Renamed", 1, &["caching"])
        };
        assert!(store.update(changed).await.expect("update"));

        let article = store.by_id(1).await.expect("by id").expect("present");
        assert_eq!(article.slug, "renamed");
        let slugs: Vec<_> = article.tags.iter().map(|tag| tag.slug.as_str()).collect();
        assert_eq!(slugs, ["caching"]);

        let request = PageRequest::first(10).expect("request");
        assert!(store.by_tag("rust", request).await.expect("tag").is_empty());
    }

    #[tokio::test]
    async fn update_rejects_unknown_or_missing_ids() {
        let store = store();
        store.create(input("Only", 1, &["rust"])).await.expect("create");
        assert!(!store.update(input("Only", 1, &["rust"])).await.expect("update"));

        let unknown = ArticleInput {
            id: Some(99),
            ..input("Other", 1, &["rust"])
        };
        assert!(!store.update(unknown).await.expect("update"));
    }

    #[tokio::test]
    async fn unknown_tag_yields_empty_page() {
        let store = store();
        let request = PageRequest::new(2, 5).expect("request");
        let page = store.by_tag("nope", request).await.expect("tag");
        assert_eq!(page, PaginationEnvelope::empty(request));
    }
}
