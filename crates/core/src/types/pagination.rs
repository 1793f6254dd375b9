//! Fixed-size page arithmetic for the product catalog.

use serde::{Deserialize, Serialize};

/// Number of products returned per catalog page.
pub const PAGE_SIZE: u32 = 10;

/// A 1-based page request.
///
/// Parsing is lenient: a missing, non-numeric, or non-positive page number
/// resolves to the first page rather than an error.
///
/// ```
/// use bazaar_core::PageRequest;
///
/// assert_eq!(PageRequest::from_param(Some("3")).page(), 3);
/// assert_eq!(PageRequest::from_param(Some("zero")).page(), 1);
/// assert_eq!(PageRequest::from_param(None).offset(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageRequest(u32);

impl PageRequest {
    /// The first page.
    pub const FIRST: Self = Self(1);

    /// Build a request for `page`, clamping zero to the first page.
    #[must_use]
    pub const fn new(page: u32) -> Self {
        if page == 0 { Self::FIRST } else { Self(page) }
    }

    /// Interpret a raw `pageNumber` query parameter.
    #[must_use]
    pub fn from_param(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .and_then(|n| u32::try_from(n).ok())
            .map_or(Self::FIRST, Self::new)
    }

    /// The 1-based page number.
    #[must_use]
    pub const fn page(self) -> u32 {
        self.0
    }

    /// Rows to skip before this page.
    #[must_use]
    pub const fn offset(self) -> i64 {
        (self.0 as i64 - 1) * PAGE_SIZE as i64
    }

    /// Maximum rows on this page.
    #[must_use]
    pub const fn limit() -> i64 {
        PAGE_SIZE as i64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::FIRST
    }
}

/// Number of pages needed to show `total` matching rows.
///
/// Zero rows yields zero pages.
#[must_use]
pub fn page_count(total: u64) -> u32 {
    u32::try_from(total.div_ceil(u64::from(PAGE_SIZE))).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_param_defaults_to_first_page() {
        assert_eq!(PageRequest::from_param(None), PageRequest::FIRST);
        assert_eq!(PageRequest::from_param(Some("")), PageRequest::FIRST);
        assert_eq!(PageRequest::from_param(Some("abc")), PageRequest::FIRST);
        assert_eq!(PageRequest::from_param(Some("0")), PageRequest::FIRST);
        assert_eq!(PageRequest::from_param(Some("-2")), PageRequest::FIRST);
    }

    #[test]
    fn test_from_param_accepts_positive_numbers() {
        assert_eq!(PageRequest::from_param(Some("2")).page(), 2);
        assert_eq!(PageRequest::from_param(Some(" 7 ")).page(), 7);
    }

    #[test]
    fn test_offset() {
        assert_eq!(PageRequest::new(1).offset(), 0);
        assert_eq!(PageRequest::new(2).offset(), 10);
        assert_eq!(PageRequest::new(5).offset(), 40);
        assert_eq!(PageRequest::limit(), 10);
    }

    #[test]
    fn test_page_count() {
        assert_eq!(page_count(0), 0);
        assert_eq!(page_count(1), 1);
        assert_eq!(page_count(10), 1);
        assert_eq!(page_count(11), 2);
        assert_eq!(page_count(25), 3);
    }
}
