//! Page/limit parsing and pagination metadata.

use serde::Serialize;

/// Largest offset a store accepts (PostgreSQL `OFFSET` is a bigint).
pub const MAX_OFFSET: u64 = i64::MAX as u64;

/// Requested page after clamping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    /// Parse raw `page` / `limit` query values. Missing or non-numeric values
    /// fall back to defaults; `page >= 1`, `1 <= limit <= max_limit`. The page is
    /// capped so the resulting offset stays within `MAX_OFFSET`.
    pub fn parse(page: Option<&str>, limit: Option<&str>, default_limit: u64, max_limit: u64) -> Self {
        let max_limit = max_limit.clamp(1, MAX_OFFSET);
        let limit = match limit.and_then(|s| s.trim().parse::<i64>().ok()) {
            Some(n) if n < 1 => 1,
            Some(n) => n as u64,
            None => default_limit,
        }
        .clamp(1, max_limit);
        let page = page
            .and_then(|s| s.trim().parse::<i64>().ok())
            .unwrap_or(1)
            .max(1) as u64;
        PageRequest {
            page: page.min(MAX_OFFSET / limit + 1),
            limit,
        }
    }

    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    pub fn info(&self, total: u64) -> PageInfo {
        let total_pages = total.div_ceil(self.limit);
        PageInfo {
            page: self.page,
            limit: self.limit,
            total,
            total_pages,
            has_next_page: self.page < total_pages,
            has_prev_page: self.page > 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub total_pages: u64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_absent_or_garbage() {
        assert_eq!(PageRequest::parse(None, None, 20, 100), PageRequest { page: 1, limit: 20 });
        assert_eq!(
            PageRequest::parse(Some("abc"), Some("x"), 20, 100),
            PageRequest { page: 1, limit: 20 }
        );
    }

    #[test]
    fn clamps_page_and_limit() {
        assert_eq!(PageRequest::parse(Some("0"), Some("0"), 20, 100), PageRequest { page: 1, limit: 1 });
        assert_eq!(PageRequest::parse(Some("-3"), Some("500"), 20, 100), PageRequest { page: 1, limit: 100 });
    }

    #[test]
    fn huge_page_keeps_offset_in_range() {
        let req = PageRequest::parse(Some("9223372036854775807"), Some("100"), 20, 100);
        assert!(req.skip() <= MAX_OFFSET);
        assert!(req.page > 1);
        let req = PageRequest::parse(Some("99999999999999999999"), Some("7"), 20, 100);
        assert_eq!(req.page, 1);
    }

    #[test]
    fn huge_max_limit_does_not_overflow() {
        let req = PageRequest::parse(None, Some("500"), 20, u64::MAX);
        assert_eq!(req.limit, 500);
        let req = PageRequest::parse(Some("2"), Some("9223372036854775807"), 20, u64::MAX);
        assert_eq!(req.limit, MAX_OFFSET);
        assert_eq!(req.skip(), MAX_OFFSET);
    }

    #[test]
    fn skip_is_page_offset() {
        let req = PageRequest::parse(Some("3"), Some("10"), 20, 100);
        assert_eq!(req.skip(), 20);
    }

    #[test]
    fn total_pages_rounds_up() {
        let req = PageRequest { page: 2, limit: 10 };
        let info = req.info(21);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next_page);
        assert!(info.has_prev_page);

        let last = PageRequest { page: 3, limit: 10 }.info(21);
        assert!(!last.has_next_page);

        let empty = PageRequest { page: 1, limit: 10 }.info(0);
        assert_eq!(empty.total_pages, 0);
        assert!(!empty.has_next_page);
        assert!(!empty.has_prev_page);
    }
}
