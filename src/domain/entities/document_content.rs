use crate::helper::error_chain_fmt;

/// Text of a document to ingest
///
/// A document cannot exist without content: the empty string is rejected at
/// parse time, before any embedding or store call.
#[derive(Debug, Clone)]
pub struct DocumentContent(String);

impl DocumentContent {
    pub fn parse(s: &str) -> Result<DocumentContent, DocumentContentError> {
        if s.is_empty() {
            return Err(DocumentContentError::EmptyContent);
        }

        Ok(Self(s.to_string()))
    }
}

impl AsRef<str> for DocumentContent {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(thiserror::Error)]
pub enum DocumentContentError {
    #[error("Document content cannot be empty")]
    EmptyContent,
}

impl std::fmt::Debug for DocumentContentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
