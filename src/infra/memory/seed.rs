//! Demo content for running without a database.

use crate::application::repos::{ContentStore, RepoError};
use crate::domain::articles::ArticleInput;

const PUBLISHED: i64 = 1;
const DRAFT: i64 = 2;

struct DemoArticle {
    status_id: i64,
    title: &'static str,
    excerpt: &'static str,
    body: &'static str,
    tags: &'static [&'static str],
}

const DEMO_ARTICLES: &[DemoArticle] = &[
    DemoArticle {
        status_id: PUBLISHED,
        title: "My first article",
        excerpt: "This is my first article, and here is a short description of it!",
        body: "Some markdown with line breaks.\n\n## A headline\nThe content under the headline.",
        tags: &["Rust", "Getting Started"],
    },
    DemoArticle {
        status_id: PUBLISHED,
        title: "My second article",
        excerpt: "A short description of the second article.",
        body: "## Caching\nRead-through caches sit in front of slow stores.",
        tags: &["Rust", "Caching"],
    },
    DemoArticle {
        status_id: PUBLISHED,
        title: "My third article",
        excerpt: "A short description of the third article.",
        body: "## Pagination\nOffset pagination keeps the envelope shape stable.",
        tags: &["Databases"],
    },
    DemoArticle {
        status_id: PUBLISHED,
        title: "My fourth article",
        excerpt: "A short description of the fourth article.",
        body: "Tags are matched by slug, so `Web Dev` and `web dev` are one tag.",
        tags: &["Caching", "Web Dev"],
    },
    DemoArticle {
        status_id: DRAFT,
        title: "My greatest life achievement",
        excerpt: "Still a draft.",
        body: "This is the story of a writer who *finishes* things.",
        tags: &["Personal"],
    },
];

/// Writes the demo articles through `store` and returns how many were accepted.
pub async fn seed_demo_content(store: &dyn ContentStore) -> Result<usize, RepoError> {
    let mut created = 0;
    for article in DEMO_ARTICLES {
        let input = ArticleInput {
            author_id: Some(1),
            status_id: Some(article.status_id),
            title: Some(article.title.to_string()),
            excerpt: Some(article.excerpt.to_string()),
            body: Some(article.body.to_string()),
            tags: article.tags.iter().map(|tag| tag.to_string()).collect(),
            ..ArticleInput::default()
        };
        if store.create(input).await? {
            created += 1;
        }
    }
    Ok(created)
}
