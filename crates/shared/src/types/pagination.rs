//! Pagination types for list endpoints.

use serde::{Deserialize, Serialize};

/// Largest page size a client may request.
pub const MAX_PER_PAGE: u32 = 100;

/// Request parameters for paginated queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    /// Page number (1-indexed).
    #[serde(default = "default_page")]
    pub page: u32,
    /// Number of items per page.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    20
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl PageRequest {
    /// Returns a copy with page >= 1 and per_page in `1..=MAX_PER_PAGE`.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            page: self.page.max(1),
            per_page: self.per_page.clamp(1, MAX_PER_PAGE),
        }
    }

    /// Calculates the offset for database queries.
    #[must_use]
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.per_page)
    }

    /// Returns the limit for database queries.
    #[must_use]
    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }
}

/// Response wrapper for paginated data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    /// The items in the current page.
    pub data: Vec<T>,
    /// Pagination metadata.
    pub meta: PageMeta,
}

/// Pagination metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    /// Current page number.
    pub page: u32,
    /// Items per page.
    pub per_page: u32,
    /// Total number of items across all pages.
    pub total: u64,
    /// Total number of pages.
    pub total_pages: u64,
}

impl<T> PageResponse<T> {
    /// Creates a new paginated response.
    #[must_use]
    pub fn new(data: Vec<T>, page: u32, per_page: u32, total: u64) -> Self {
        let total_pages = if total == 0 || per_page == 0 {
            1
        } else {
            total.div_ceil(u64::from(per_page))
        };

        Self {
            data,
            meta: PageMeta {
                page,
                per_page,
                total,
                total_pages,
            },
        }
    }

    /// Maps the page items while keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResponse<U> {
        PageResponse {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_first_page_of_twenty_by_default() {
        let request = PageRequest::default();
        assert_eq!((request.page, request.per_page), (1, 20));
        assert_eq!(request.offset(), 0);
    }

    #[rstest]
    #[case(0, 1000, 1, MAX_PER_PAGE)]
    #[case(3, 0, 3, 1)]
    #[case(2, 50, 2, 50)]
    fn test_normalized(
        #[case] page: u32,
        #[case] per_page: u32,
        #[case] want_page: u32,
        #[case] want_per_page: u32,
    ) {
        let request = PageRequest { page, per_page }.normalized();
        assert_eq!(request.page, want_page);
        assert_eq!(request.per_page, want_per_page);
    }

    #[rstest]
    #[case(1, 25, 0)]
    #[case(3, 25, 50)]
    #[case(0, 25, 0)]
    fn test_offset(#[case] page: u32, #[case] per_page: u32, #[case] offset: u64) {
        assert_eq!(PageRequest { page, per_page }.offset(), offset);
    }

    #[rstest]
    #[case(0, 1)]
    #[case(20, 2)]
    #[case(21, 3)]
    fn test_total_pages(#[case] total: u64, #[case] pages: u64) {
        let response: PageResponse<u8> = PageResponse::new(Vec::new(), 1, 10, total);
        assert_eq!(response.meta.total_pages, pages);
    }

    #[test]
    fn test_map_keeps_meta() {
        let response = PageResponse::new(vec!["INV-000001", "INV-000002"], 2, 2, 4)
            .map(str::len);
        assert_eq!(response.data, vec![10, 10]);
        assert_eq!(response.meta.page, 2);
        assert_eq!(response.meta.total, 4);
    }
}
