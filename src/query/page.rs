//! Pagination window

use super::errors::{QueryError, QueryResult};

/// Default number of documents per page
pub const DEFAULT_PAGE_SIZE: u64 = 60;

/// Page number and size, applied per collection as skip/limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    page: u64,
    page_size: u64,
}

impl PageSpec {
    /// Validates signed input, as received from JSON or a CLI
    pub fn new(page: i64, page_size: i64) -> QueryResult<Self> {
        if page < 0 {
            return Err(QueryError::InvalidPage(format!(
                "page must be non-negative, got {}",
                page
            )));
        }
        if page_size <= 0 {
            return Err(QueryError::InvalidPage(format!(
                "page_size must be positive, got {}",
                page_size
            )));
        }
        let spec = Self {
            page: page as u64,
            page_size: page_size as u64,
        };
        spec.page
            .checked_mul(spec.page_size)
            .filter(|skip| *skip <= i64::MAX as u64)
            .ok_or_else(|| QueryError::InvalidPage("page offset overflows".to_string()))?;
        Ok(spec)
    }

    /// First page with the default size
    pub fn first() -> Self {
        Self {
            page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn skip(&self) -> u64 {
        self.page * self.page_size
    }

    /// Limit in the driver's signed representation
    pub fn limit(&self) -> i64 {
        i64::try_from(self.page_size).unwrap_or(i64::MAX)
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_and_limit() {
        let page = PageSpec::new(1, 10).unwrap();
        assert_eq!(page.skip(), 10);
        assert_eq!(page.limit(), 10);

        let page = PageSpec::new(0, 60).unwrap();
        assert_eq!(page.skip(), 0);
    }

    #[test]
    fn test_negative_page_rejected() {
        assert!(matches!(
            PageSpec::new(-1, 10),
            Err(QueryError::InvalidPage(_))
        ));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(PageSpec::new(0, 0).is_err());
        assert!(PageSpec::new(0, -5).is_err());
    }

    #[test]
    fn test_overflowing_offset_rejected() {
        assert!(PageSpec::new(i64::MAX, 2).is_err());
    }

    #[test]
    fn test_default_is_first_page() {
        let page = PageSpec::default();
        assert_eq!(page.page(), 0);
        assert_eq!(page.page_size(), DEFAULT_PAGE_SIZE);
    }
}
