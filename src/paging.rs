//! Page requests and paged results for list queries.

use serde::{Deserialize, Serialize};

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request, clamped to sane bounds on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    number: u32,
    size: u32,
}

impl PageRequest {
    /// Creates a page request.
    ///
    /// A zero page number becomes `1`; a zero size becomes
    /// [`DEFAULT_PAGE_SIZE`]; sizes above [`MAX_PAGE_SIZE`] are capped.
    #[must_use]
    pub fn new(number: u32, size: u32) -> Self {
        let clamped_size = if size == 0 {
            DEFAULT_PAGE_SIZE
        } else {
            size.min(MAX_PAGE_SIZE)
        };
        Self {
            number: number.max(1),
            size: clamped_size,
        }
    }

    /// Returns the one-based page number.
    #[must_use]
    pub const fn number(self) -> u32 {
        self.number
    }

    /// Returns the page size.
    #[must_use]
    pub const fn size(self) -> u32 {
        self.size
    }

    /// Returns the number of items to skip.
    #[must_use]
    pub const fn offset(self) -> u64 {
        (self.number as u64 - 1) * self.size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of results together with the unpaged total.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Number of items matching the query across all pages.
    pub total: u64,
}

impl<T> Page<T> {
    /// Builds a page by slicing an already filtered and ordered collection.
    #[must_use]
    pub fn from_sorted(all: Vec<T>, request: PageRequest) -> Self {
        let total = all.len() as u64;
        let skip = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let take = usize::try_from(request.size()).unwrap_or(usize::MAX);
        let items = all.into_iter().skip(skip).take(take).collect();
        Self { items, total }
    }
}
