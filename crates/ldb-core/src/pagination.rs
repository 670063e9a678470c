//! Page/limit normalization for list queries.

use serde::{Deserialize, Serialize};

/// A normalized, 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Records per page when the client does not ask for a size.
    pub const DEFAULT_LIMIT: u32 = 20;
    /// Upper bound on records per page.
    pub const MAX_LIMIT: u32 = 100;

    /// Build a page request from raw query values.
    ///
    /// Missing or non-positive pages become page 1. Missing or non-positive
    /// limits become [`Self::DEFAULT_LIMIT`]; oversized limits are clamped
    /// to [`Self::MAX_LIMIT`].
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Self {
        let page = match page {
            Some(p) if p >= 1 => u32::try_from(p).unwrap_or(u32::MAX),
            _ => 1,
        };
        let limit = match limit {
            Some(l) if l >= 1 => u32::try_from(l)
                .unwrap_or(Self::MAX_LIMIT)
                .min(Self::MAX_LIMIT),
            _ => Self::DEFAULT_LIMIT,
        };
        Self { page, limit }
    }

    /// The 1-based page number.
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Records per page.
    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip.
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Total page count for `total` records (at least 1).
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit)).max(1)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}
