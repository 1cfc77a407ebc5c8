//! Pagination primitives for the listing surfaces.

use serde::{Deserialize, Serialize};

/// A bounded page request. `page` is 1-based.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub const MAX_LIMIT: u64 = 100;

    /// Clamp raw query input into a valid request.
    ///
    /// Out-of-range values are coerced rather than rejected: page floors at 1,
    /// limit is clamped to `1..=MAX_LIMIT`.
    pub fn clamped(page: Option<u64>, limit: Option<u64>, default_limit: u64) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(default_limit).clamp(1, Self::MAX_LIMIT),
        }
    }

    pub fn offset(&self) -> u64 {
        // page floors at 1, but arbitrary query input must not overflow.
        self.page.saturating_sub(1).saturating_mul(self.limit)
    }
}

/// Page metadata returned alongside listed items.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
}

impl PageInfo {
    pub fn new(request: PageRequest, total: u64) -> Self {
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(request.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamping_applies_bounds() {
        let req = PageRequest::clamped(Some(0), Some(10_000), 20);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, PageRequest::MAX_LIMIT);

        let req = PageRequest::clamped(None, None, 20);
        assert_eq!(req.page, 1);
        assert_eq!(req.limit, 20);
    }

    #[test]
    fn huge_page_numbers_do_not_overflow_the_offset() {
        let req = PageRequest::clamped(Some(u64::MAX), Some(100), 20);
        assert_eq!(req.offset(), u64::MAX);
    }

    #[test]
    fn offset_and_total_pages() {
        let req = PageRequest::clamped(Some(3), Some(20), 20);
        assert_eq!(req.offset(), 40);
        assert_eq!(PageInfo::new(req, 41).total_pages, 3);
        assert_eq!(PageInfo::new(req, 40).total_pages, 2);
        assert_eq!(PageInfo::new(req, 0).total_pages, 0);
    }
}
