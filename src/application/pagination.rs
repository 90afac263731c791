//! Offset pagination shared by every listing query.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_PAGE_LIMIT: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PaginationError {
    #[error("page must be at least 1, got {0}")]
    InvalidPage(u32),
    #[error("limit must be at least 1, got {0}")]
    InvalidLimit(u32),
}

/// A validated 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Result<Self, PaginationError> {
        if page == 0 {
            return Err(PaginationError::InvalidPage(page));
        }
        if limit == 0 {
            return Err(PaginationError::InvalidLimit(limit));
        }
        Ok(Self { page, limit })
    }

    pub fn first(limit: u32) -> Result<Self, PaginationError> {
        Self::new(1, limit)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of items skipped before this page.
    pub fn offset(&self) -> u64 {
        u64::from(self.limit) * u64::from(self.page - 1)
    }

    /// Largest number of items this page can hold out of `total_items`.
    pub fn capacity_for(&self, total_items: u64) -> usize {
        let remaining = total_items.saturating_sub(self.offset());
        remaining.min(u64::from(self.limit)) as usize
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }
}

/// One page of results together with the size of the whole filtered set.
///
/// `items.len()` never exceeds `min(limit, max(0, total_items - limit * (page - 1)))`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationEnvelope<T> {
    pub page: u32,
    pub limit: u32,
    pub total_items: u64,
    pub items: Vec<T>,
}

impl<T> PaginationEnvelope<T> {
    /// Build an envelope, dropping any items beyond what the page may hold.
    pub fn new(request: PageRequest, total_items: u64, mut items: Vec<T>) -> Self {
        items.truncate(request.capacity_for(total_items));
        Self {
            page: request.page(),
            limit: request.limit(),
            total_items,
            items,
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::new(request, 0, Vec::new())
    }

    pub fn total_pages(&self) -> u64 {
        self.total_items.div_ceil(u64::from(self.limit.max(1)))
    }

    pub fn has_next_page(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U, F>(self, f: F) -> PaginationEnvelope<U>
    where
        F: FnMut(T) -> U,
    {
        PaginationEnvelope {
            page: self.page,
            limit: self.limit,
            total_items: self.total_items,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_page_and_zero_limit() {
        assert_eq!(PageRequest::new(0, 10), Err(PaginationError::InvalidPage(0)));
        assert_eq!(PageRequest::new(1, 0), Err(PaginationError::InvalidLimit(0)));
    }

    #[test]
    fn large_limits_are_accepted() {
        let request = PageRequest::new(1, 200).expect("large limit");
        assert_eq!(request.limit(), 200);
        assert_eq!(request.capacity_for(250), 200);
    }

    #[test]
    fn offset_skips_previous_pages() {
        let request = PageRequest::new(3, 10).expect("valid request");
        assert_eq!(request.offset(), 20);
        assert_eq!(request.capacity_for(25), 5);
        assert_eq!(request.capacity_for(15), 0);
        assert_eq!(request.capacity_for(100), 10);
    }

    #[test]
    fn envelope_truncates_items_beyond_capacity() {
        let request = PageRequest::new(3, 10).expect("valid request");
        let envelope = PaginationEnvelope::new(request, 25, (0..8).collect::<Vec<_>>());
        assert_eq!(envelope.items, [0, 1, 2, 3, 4]);
        assert_eq!(envelope.total_items, 25);
        assert_eq!(envelope.total_pages(), 3);
        assert!(!envelope.has_next_page());
    }

    #[test]
    fn empty_envelope_keeps_request_shape() {
        let request = PageRequest::new(2, 5).expect("valid request");
        let envelope: PaginationEnvelope<u8> = PaginationEnvelope::empty(request);
        assert_eq!(envelope.page, 2);
        assert_eq!(envelope.limit, 5);
        assert_eq!(envelope.total_items, 0);
        assert!(envelope.is_empty());
        assert_eq!(envelope.total_pages(), 0);
    }

    #[test]
    fn map_preserves_counts() {
        let request = PageRequest::first(2).expect("valid request");
        let envelope = PaginationEnvelope::new(request, 7, vec![1, 2]).map(|n| n * 10);
        assert_eq!(envelope.items, [10, 20]);
        assert_eq!(envelope.total_items, 7);
        assert!(envelope.has_next_page());
    }
}
