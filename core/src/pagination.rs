//! Pagination metadata carried in response headers.
//!
//! Missing or malformed headers are normal (single-item responses, endpoints
//! without pagination, keyset pagination omitting totals) and are reported as
//! `None`, never as errors.

use crate::http::Response;

pub const PAGE_HEADER: &str = "X-Page";
pub const PREV_PAGE_HEADER: &str = "X-Prev-Page";
pub const NEXT_PAGE_HEADER: &str = "X-Next-Page";
pub const PER_PAGE_HEADER: &str = "X-Per-Page";
pub const TOTAL_PAGES_HEADER: &str = "X-Total-Pages";
pub const TOTAL_HEADER: &str = "X-Total";

/// Page metadata of one list response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: Option<u64>,
    pub previous_page: Option<u64>,
    pub next_page: Option<u64>,
    pub per_page: Option<u64>,
    pub total_pages: Option<u64>,
    pub total: Option<u64>,
}

impl Pagination {
    /// Read the six pagination headers. Names match case-sensitively and the
    /// first occurrence of a name wins.
    pub fn from_headers(headers: &[(String, String)]) -> Self {
        let read = |name: &str| -> Option<u64> {
            headers
                .iter()
                .find(|(k, _)| k == name)
                .and_then(|(_, v)| v.trim().parse().ok())
        };
        Self {
            current_page: read(PAGE_HEADER),
            previous_page: read(PREV_PAGE_HEADER),
            next_page: read(NEXT_PAGE_HEADER),
            per_page: read(PER_PAGE_HEADER),
            total_pages: read(TOTAL_PAGES_HEADER),
            total: read(TOTAL_HEADER),
        }
    }

    pub fn has_next_page(&self) -> bool {
        self.next_page.is_some()
    }
}

/// One page of a collection together with its pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> PaginatedResult<T> {
    /// Split a list response into items and page metadata. Performs no I/O.
    pub fn wrap(response: Response<Vec<T>>) -> Self {
        let pagination = Pagination::from_headers(&response.headers);
        Self {
            items: response.data.unwrap_or_default(),
            pagination,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T> IntoIterator for PaginatedResult<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn response(pairs: &[(&str, &str)]) -> Response<Vec<u32>> {
        Response {
            status: 200,
            headers: headers(pairs),
            body: b"[1,2]".to_vec(),
            data: Some(vec![1, 2]),
        }
    }

    #[test]
    fn reads_all_six_headers() {
        let page = PaginatedResult::wrap(response(&[
            ("X-Page", "5"),
            ("X-Prev-Page", "4"),
            ("X-Next-Page", "6"),
            ("X-Per-Page", "20"),
            ("X-Total-Pages", "10"),
            ("X-Total", "200"),
        ]));
        assert_eq!(
            page.pagination,
            Pagination {
                current_page: Some(5),
                previous_page: Some(4),
                next_page: Some(6),
                per_page: Some(20),
                total_pages: Some(10),
                total: Some(200),
            }
        );
        assert_eq!(page.items, vec![1, 2]);
        assert!(page.pagination.has_next_page());
    }

    #[test]
    fn malformed_header_only_nulls_that_field() {
        let page = PaginatedResult::wrap(response(&[
            ("X-Page", "incorrect"),
            ("X-Prev-Page", "4"),
            ("X-Next-Page", ""),
            ("X-Per-Page", "-20"),
            ("X-Total", "200"),
        ]));
        assert_eq!(page.pagination.current_page, None);
        assert_eq!(page.pagination.previous_page, Some(4));
        assert_eq!(page.pagination.next_page, None);
        assert_eq!(page.pagination.per_page, None);
        assert_eq!(page.pagination.total_pages, None);
        assert_eq!(page.pagination.total, Some(200));
        assert!(!page.pagination.has_next_page());
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let p = Pagination::from_headers(&headers(&[("x-page", "3")]));
        assert_eq!(p.current_page, None);
    }

    #[test]
    fn first_duplicate_wins() {
        let p = Pagination::from_headers(&headers(&[("X-Total", "7"), ("X-Total", "8")]));
        assert_eq!(p.total, Some(7));
    }

    #[test]
    fn no_headers_and_no_data() {
        let page: PaginatedResult<u32> = PaginatedResult::wrap(Response {
            status: 304,
            headers: Vec::new(),
            body: Vec::new(),
            data: None,
        });
        assert!(page.is_empty());
        assert_eq!(page.pagination, Pagination::default());
    }
}
