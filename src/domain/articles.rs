//! Article write payloads and their validation rules.

use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::slug::derive_slug;

/// Loose write payload for `create` and `update`.
///
/// Every field is optional so a payload with missing fields can be represented;
/// [`ArticleInput::validate`] decides whether it is complete.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleInput {
    pub id: Option<i64>,
    pub author_id: Option<i64>,
    pub status_id: Option<i64>,
    pub title: Option<String>,
    pub slug: Option<String>,
    pub excerpt: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// A payload that passed validation. Tag names are trimmed and de-duplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidArticle {
    pub author_id: i64,
    pub status_id: i64,
    pub title: String,
    pub slug: String,
    pub excerpt: String,
    pub body: String,
    pub tags: Vec<TagName>,
}

/// A tag display text paired with its slug.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagName {
    pub name: String,
    pub slug: String,
}

impl ArticleInput {
    pub fn validate(&self) -> Result<ValidArticle, DomainError> {
        let author_id = self
            .author_id
            .ok_or_else(|| DomainError::validation("author_id is required"))?;
        let status_id = self
            .status_id
            .ok_or_else(|| DomainError::validation("status_id is required"))?;
        let title = required_text(self.title.as_deref(), "title")?;
        let excerpt = required_text(self.excerpt.as_deref(), "excerpt")?;
        let body = required_text(self.body.as_deref(), "body")?;

        let slug_source = match self.slug.as_deref().map(str::trim) {
            Some(slug) if !slug.is_empty() => slug,
            _ => title.as_str(),
        };
        let slug = derive_slug(slug_source)
            .map_err(|err| DomainError::validation(format!("slug: {err}")))?;

        let tags = normalize_tags(&self.tags);
        if tags.is_empty() {
            return Err(DomainError::validation("at least one tag is required"));
        }

        Ok(ValidArticle {
            author_id,
            status_id,
            title,
            slug,
            excerpt,
            body,
            tags,
        })
    }
}

/// Split a comma-separated tag field into trimmed, non-empty display texts.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for name in raw.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        if !seen.iter().any(|existing: &String| existing == name) {
            seen.push(name.to_string());
        }
    }
    seen
}

fn normalize_tags(raw: &[String]) -> Vec<TagName> {
    let mut tags: Vec<TagName> = Vec::with_capacity(raw.len());
    for name in raw.iter().map(|name| name.trim()) {
        let Ok(slug) = derive_slug(name) else {
            continue;
        };
        if tags.iter().any(|tag| tag.slug == slug) {
            continue;
        }
        tags.push(TagName {
            name: name.to_string(),
            slug,
        });
    }
    tags
}

fn required_text(value: Option<&str>, field: &'static str) -> Result<String, DomainError> {
    match value.map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(DomainError::validation(format!("{field} is required"))),
    }
}
