pub mod health_check;
pub mod ingest_document;
pub mod search_documents;

pub use health_check::*;
pub use ingest_document::*;
pub use search_documents::*;
