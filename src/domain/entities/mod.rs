pub mod document;
pub mod document_content;
pub mod embedding;
pub mod search_limit;
pub mod search_query;
