//! Pagination and sorting utilities.
//!
//! Listing endpoints accept skip/take pagination and a dynamic sort key over
//! an allow-list. The total match count is always computed before skip/take
//! are applied, so a page can be reported alongside the total.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum rows a single page may request.
const MAX_TAKE: u32 = 100;

/// Skip/take pagination parameters for listing requests.
///
/// Absent values mean "from the start" and "no limit" respectively.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PageRequest {
    /// Rows to skip over the filtered, sorted result.
    #[serde(default)]
    pub skip: Option<u32>,

    /// Rows to return after skipping.
    #[serde(default)]
    pub take: Option<u32>,
}

impl PageRequest {
    /// Create pagination parameters, clamping `take` to the maximum page size.
    pub fn new(skip: u32, take: u32) -> Self {
        Self {
            skip: Some(skip),
            take: Some(take.min(MAX_TAKE)),
        }
    }

    /// Effective number of rows to skip.
    pub fn offset(&self) -> usize {
        self.skip.unwrap_or(0) as usize
    }

    /// Effective page size, if any.
    pub fn limit(&self) -> Option<usize> {
        self.take.map(|t| t as usize)
    }
}

/// Sort direction for query results.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        Self::Asc
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Asc => write!(f, "ASC"),
            Self::Desc => write!(f, "DESC"),
        }
    }
}

impl From<&str> for SortDirection {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "desc" | "descending" => Self::Desc,
            _ => Self::Asc,
        }
    }
}

/// Dynamic sort parameters: a caller-supplied key name and direction.
///
/// The key name is resolved through each entity's explicit allow-list;
/// unrecognized names fall back to the default sort key (creation time).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortParams {
    /// Field to sort by
    pub field: String,

    /// Sort direction
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortParams {
    /// Create new sort parameters.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Create ascending sort parameters.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Create descending sort parameters.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }
}

impl Default for SortParams {
    fn default() -> Self {
        Self {
            field: "created".to_string(),
            direction: SortDirection::Asc,
        }
    }
}

/// One page of results together with the total match count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResult<T> {
    /// The rows of the requested page
    pub items: Vec<T>,

    /// Total matching rows before skip/take were applied
    pub total: u64,

    /// Rows skipped to reach this page
    pub skip: u32,

    /// Requested page size, if one was set
    pub take: Option<u32>,
}

impl<T> PaginatedResult<T> {
    /// Create a new paginated result.
    pub fn new(items: Vec<T>, total: u64, page: PageRequest) -> Self {
        Self {
            items,
            total,
            skip: page.skip.unwrap_or(0),
            take: page.take,
        }
    }

    /// Whether more rows exist beyond this page.
    pub fn has_more(&self) -> bool {
        (self.skip as u64 + self.items.len() as u64) < self.total
    }

    /// Map the items to a different type.
    pub fn map<U, F>(self, f: F) -> PaginatedResult<U>
    where
        F: FnMut(T) -> U,
    {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            skip: self.skip,
            take: self.take,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::default();
        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), None);
    }

    #[test]
    fn test_page_request_clamps_take() {
        let page = PageRequest::new(10, 500);
        assert_eq!(page.offset(), 10);
        assert_eq!(page.limit(), Some(100));
    }

    #[test]
    fn test_sort_direction_parsing() {
        assert_eq!(SortDirection::from("asc"), SortDirection::Asc);
        assert_eq!(SortDirection::from("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::from("descending"), SortDirection::Desc);
        assert_eq!(SortDirection::from("invalid"), SortDirection::Asc);
    }

    #[test]
    fn test_sort_params() {
        let sort = SortParams::asc("name");
        assert_eq!(sort.field, "name");
        assert_eq!(sort.direction, SortDirection::Asc);

        let sort = SortParams::default();
        assert_eq!(sort.field, "created");
    }

    #[test]
    fn test_paginated_result_reports_total() {
        let result = PaginatedResult::new(vec![1, 2, 3], 10, PageRequest::new(3, 3));
        assert_eq!(result.total, 10);
        assert_eq!(result.skip, 3);
        assert!(result.has_more());

        let last = PaginatedResult::new(vec![1], 4, PageRequest::new(3, 3));
        assert!(!last.has_more());
    }

    #[test]
    fn test_paginated_result_map() {
        let result = PaginatedResult::new(vec![1, 2, 3], 10, PageRequest::default());
        let mapped = result.map(|x| x * 2);
        assert_eq!(mapped.items, vec![2, 4, 6]);
        assert_eq!(mapped.total, 10);
    }
}
