//! Pagination utilities for the service layer.
//!
//! `Pagination` is the raw client input; `normalize` turns it into a 1-based page and a
//! bounded limit according to the configured `PaginationConfig`.

use configs::PaginationConfig;
use serde::{Deserialize, Serialize};

/// Pagination parameters as received from a query string.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct Pagination {
    /// 1-based page index; 0 or missing means the first page
    pub page: Option<u64>,
    /// items per page; 0 or missing means the configured default
    pub limit: Option<u64>,
}

impl Pagination {
    pub fn new(page: u64, limit: u64) -> Self { Self { page: Some(page), limit: Some(limit) } }

    /// Clamp to sane values: returns `(page, limit)` with `page >= 1`, `1 <= limit <= max_limit`
    /// and `page * limit` within `i64::MAX`.
    pub fn normalize(self, cfg: &PaginationConfig) -> (u64, u64) {
        let page = self.page.filter(|p| *p > 0).unwrap_or(1);
        let limit = self.limit.filter(|l| *l > 0).unwrap_or(cfg.default_limit).clamp(1, cfg.max_limit.max(1));
        // keep the row offset representable as a SQL BIGINT
        let page = page.min(i64::MAX as u64 / limit);
        (page, limit)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(total: u64, page: u64, limit: u64) -> Self {
        Self { total, page, limit, total_pages: total.div_ceil(limit.max(1)) }
    }
}

/// One page of items plus the metadata needed to request the others.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page { data: self.data.into_iter().map(f).collect(), pagination: self.pagination }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PaginationConfig { PaginationConfig { default_limit: 20, max_limit: 100 } }

    #[test]
    fn normalize_falls_back_to_defaults() {
        assert_eq!(Pagination::default().normalize(&cfg()), (1, 20));
        assert_eq!(Pagination::new(0, 0).normalize(&cfg()), (1, 20));
    }

    #[test]
    fn normalize_clamps_upper_bound() {
        assert_eq!(Pagination::new(5, 1000).normalize(&cfg()), (5, 100));
    }

    #[test]
    fn normalize_caps_huge_pages() {
        let (page, limit) = Pagination::new(u64::MAX, 20).normalize(&cfg());
        assert_eq!(limit, 20);
        assert!(page.checked_mul(limit).is_some_and(|o| o <= i64::MAX as u64));
    }

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(PageMeta::new(0, 1, 20).total_pages, 0);
        assert_eq!(PageMeta::new(20, 1, 20).total_pages, 1);
        assert_eq!(PageMeta::new(21, 1, 20).total_pages, 2);
    }

    #[test]
    fn meta_serializes_camel_case() {
        let v = serde_json::to_value(PageMeta::new(45, 2, 20)).unwrap();
        assert_eq!(v["totalPages"], 3);
    }
}
