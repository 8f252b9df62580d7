//! Pagination inputs and the list response envelope.

use serde::{Deserialize, Serialize};

/// Default page size.
const DEFAULT_LIMIT: u64 = 10;

/// Maximum page size.
const MAX_LIMIT: u64 = 100;

/// Page and limit query parameters.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// 1-indexed page number.
    pub page: u64,
    /// Rows per page.
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    /// Clamp page and limit into their valid ranges.
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, MAX_LIMIT),
        }
    }

    /// Rows to skip for this page.
    #[must_use]
    pub const fn offset(&self) -> u64 {
        (self.page.saturating_sub(1)) * self.limit
    }
}

/// Metadata returned alongside a page of results.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    /// 1-indexed page number.
    pub page: u64,
    /// Rows per page.
    pub limit: u64,
    /// Total matching rows.
    pub total: u64,
    /// Total pages at this limit.
    pub total_pages: u64,
}

/// A page of results with its metadata.
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    /// The rows of this page.
    pub data: Vec<T>,
    /// Page metadata.
    pub meta: PageMeta,
}

impl<T> Paginated<T> {
    /// Build a page from items, the total count, and the query that produced
    /// them.
    #[must_use]
    pub fn new(data: Vec<T>, total: u64, pagination: &Pagination) -> Self {
        Self {
            data,
            meta: PageMeta {
                page: pagination.page,
                limit: pagination.limit,
                total,
                total_pages: total.div_ceil(pagination.limit.max(1)),
            },
        }
    }

    /// Map the page's items, keeping the metadata.
    #[must_use]
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Paginated<U> {
        Paginated {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
