use crate::helper::error_chain_fmt;

/// Text of a similarity search query
///
/// Same discipline as the ingested content: the empty string is rejected
/// before the query is embedded.
#[derive(Debug, Clone)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn parse(s: &str) -> Result<SearchQuery, SearchQueryError> {
        if s.is_empty() {
            return Err(SearchQueryError::EmptyQuery);
        }

        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for SearchQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SearchQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(thiserror::Error)]
pub enum SearchQueryError {
    #[error("Search query cannot be empty")]
    EmptyQuery,
}

impl std::fmt::Debug for SearchQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
