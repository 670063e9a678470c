//! Response metadata and page links.

use ldb_core::PageRequest;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `meta` object of every success envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PaginationMeta {
    /// Number of items in `data`.
    pub resource_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u64>,
    /// Relative link to the next page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<String>,
    /// Relative link to the previous page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<String>,
}

impl PaginationMeta {
    /// Meta for an unpaginated response carrying `count` items.
    pub fn single(count: u64) -> Self {
        Self {
            resource_count: count,
            page: None,
            limit: None,
            total_pages: None,
            next: None,
            previous: None,
        }
    }

    /// Meta for one page of a listing at `path` holding `count` of `total` items.
    ///
    /// `filters` are extra `key=value` query pairs carried into the links.
    pub fn paged(
        path: &str,
        filters: &[(&str, String)],
        page: PageRequest,
        count: u64,
        total: u64,
    ) -> Self {
        let total_pages = page.total_pages(total);
        let current = u64::from(page.page());

        let link = |target: u64| {
            let mut query: Vec<String> = filters.iter().map(|(k, v)| format!("{k}={v}")).collect();
            query.push(format!("page={target}"));
            query.push(format!("limit={}", page.limit()));
            format!("{path}?{}", query.join("&"))
        };

        Self {
            resource_count: count,
            page: Some(page.page()),
            limit: Some(page.limit()),
            total_pages: Some(total_pages),
            next: (current < total_pages).then(|| link(current + 1)),
            previous: (current > 1).then(|| link((current - 1).min(total_pages))),
        }
    }
}
