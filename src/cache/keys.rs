//! Cache key derivation.
//!
//! Every read operation maps to one [`CacheKey`] variant. [`CacheKey::build`]
//! feeds the scope and the ordered parameters through SHA-256, so two queries
//! share a cache slot only when every parameter matches.

use sha2::{Digest, Sha256};

use crate::application::pagination::PageRequest;

/// Shape of a read query, used as the canonical cache key input.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    ById {
        id: i64,
    },
    ByPage {
        page: u32,
        limit: u32,
        include_unpublished: bool,
    },
    BySlug {
        slug: String,
    },
    ByTag {
        tag_slug: String,
        page: u32,
        limit: u32,
    },
}

impl CacheKey {
    pub fn by_id(id: i64) -> Self {
        Self::ById { id }
    }

    pub fn by_page(request: PageRequest, include_unpublished: bool) -> Self {
        Self::ByPage {
            page: request.page(),
            limit: request.limit(),
            include_unpublished,
        }
    }

    pub fn by_slug(slug: &str) -> Self {
        Self::BySlug {
            slug: slug.to_string(),
        }
    }

    pub fn by_tag(tag_slug: &str, request: PageRequest) -> Self {
        Self::ByTag {
            tag_slug: tag_slug.to_string(),
            page: request.page(),
            limit: request.limit(),
        }
    }

    /// Operation namespace of the key.
    pub fn scope(&self) -> &'static str {
        match self {
            CacheKey::ById { .. } => "id",
            CacheKey::ByPage { .. } => "page",
            CacheKey::BySlug { .. } => "slug",
            CacheKey::ByTag { .. } => "tag",
        }
    }

    /// Fixed-length (64 hex characters) key for the cache store.
    pub fn build(&self) -> String {
        let mut hasher = Sha256::new();
        write_field(&mut hasher, b's', self.scope().as_bytes());

        match self {
            CacheKey::ById { id } => {
                write_field(&mut hasher, b'i', &id.to_be_bytes());
            }
            CacheKey::ByPage {
                page,
                limit,
                include_unpublished,
            } => {
                write_field(&mut hasher, b'u', &page.to_be_bytes());
                write_field(&mut hasher, b'u', &limit.to_be_bytes());
                write_field(&mut hasher, b'b', &[u8::from(*include_unpublished)]);
            }
            CacheKey::BySlug { slug } => {
                write_field(&mut hasher, b's', slug.as_bytes());
            }
            CacheKey::ByTag {
                tag_slug,
                page,
                limit,
            } => {
                write_field(&mut hasher, b's', tag_slug.as_bytes());
                write_field(&mut hasher, b'u', &page.to_be_bytes());
                write_field(&mut hasher, b'u', &limit.to_be_bytes());
            }
        }

        hex::encode(hasher.finalize())
    }
}

// Type tag and length prefix keep the encoding injective: ("ab", "c") and
// ("a", "bc") never feed the same bytes to the hasher.
fn write_field(hasher: &mut Sha256, kind: u8, bytes: &[u8]) {
    hasher.update([kind]);
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}
