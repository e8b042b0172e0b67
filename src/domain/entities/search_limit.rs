use crate::helper::error_chain_fmt;

/// Number of hits a search returns, bounded to keep result sets small
#[derive(Debug, Clone, Copy)]
pub struct SearchLimit(i64);

impl SearchLimit {
    pub const MIN: i64 = 1;
    pub const MAX: i64 = 50;
    /// Applied when a search request does not provide `k`
    pub const DEFAULT: i64 = 3;

    pub fn parse(value: i64) -> Result<SearchLimit, SearchLimitError> {
        if !(Self::MIN..=Self::MAX).contains(&value) {
            return Err(SearchLimitError::OutOfRange(value));
        }

        Ok(Self(value))
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

#[derive(thiserror::Error)]
pub enum SearchLimitError {
    #[error("k must be between 1 and 50, got {0}")]
    OutOfRange(i64),
}

impl std::fmt::Debug for SearchLimitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
