//! # Pagination Results
//!
//! Page envelope returned by `DataAccess::paginate`: the rows plus
//! exact totals and navigation flags, and timing metadata.

use serde::{Deserialize, Serialize};

use crate::document::Stored;

/// Page position and navigation flags
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// 1-based page number of this result
    pub current_page: usize,
    /// Total pages at the requested page size
    pub total_pages: usize,
    /// Total matching documents (exact, from a full filtered scan)
    pub total_items: usize,
    /// Whether a later page exists
    pub has_next: bool,
    /// Whether an earlier page exists
    pub has_previous: bool,
}

/// Query execution metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    /// Wall-clock time the page took to assemble, in milliseconds
    pub query_time_ms: u64,
    /// Whether the rows came from cache (pages are never cached today)
    pub from_cache: bool,
}

/// One page of results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The rows on this page, in query order
    pub data: Vec<Stored<T>>,
    /// Position and navigation
    pub pagination: PageInfo,
    /// Execution metadata
    pub metadata: PageMeta,
}

impl PageInfo {
    /// Derive page info from totals
    pub fn new(current_page: usize, page_size: usize, total_items: usize) -> Self {
        let total_pages = total_items.div_ceil(page_size);
        Self {
            current_page,
            total_pages,
            total_items,
            has_next: current_page < total_pages,
            has_previous: current_page > 1,
        }
    }
}
