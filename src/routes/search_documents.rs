use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::domain::entities::embedding::{Embedding, EmbeddingError};
use crate::domain::entities::search_limit::{SearchLimit, SearchLimitError};
use crate::domain::entities::search_query::{SearchQuery, SearchQueryError};
use crate::domain::services::openai_embeddings_service::{
    OpenAiEmbeddingsService, OpenAiEmbeddingsServiceError,
};
use crate::helper::error_chain_fmt;
use crate::repositories::document_postgres_repository::{
    DocumentPostgresRepository, DocumentPostgresRepositoryError,
};

/// Embeds the query and returns the k closest documents, most similar first
///
/// `k` defaults to 3 when absent. Validation happens before the embeddings
/// API is called.
#[tracing::instrument(
    name = "Search documents",
    skip(pool, embeddings_service, document_repository, body)
)]
pub async fn search_documents(
    pool: web::Data<PgPool>,
    embeddings_service: web::Data<OpenAiEmbeddingsService>,
    document_repository: web::Data<DocumentPostgresRepository>,
    body: web::Json<SearchDocumentsBodyData>,
) -> Result<HttpResponse, SearchDocumentsError> {
    let query = SearchQuery::parse(&body.query)?;
    let limit = SearchLimit::parse(body.k)?;

    info!(k = limit.as_i64(), "Searching documents");

    let embedding = embeddings_service.embed(query.as_ref()).await?;
    let embedding = Embedding::parse(embedding)?;
    let query_embedding_literal = embedding.to_vector_literal();

    let hits = document_repository
        .search_documents(pool.get_ref(), &query_embedding_literal, limit.as_i64())
        .await?;

    info!(nb_hits = hits.len(), "Found closest documents");
    Ok(HttpResponse::Ok().json(json!({ "hits": hits })))
}

fn default_limit() -> i64 {
    SearchLimit::DEFAULT
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct SearchDocumentsBodyData {
    pub query: String,
    // An absent k falls back to the default; an explicit null is a type
    // error, not the default
    #[serde(default = "default_limit")]
    pub k: i64,
}

#[derive(thiserror::Error)]
pub enum SearchDocumentsError {
    #[error("{0}")]
    InvalidQuery(#[from] SearchQueryError),
    #[error("{0}")]
    InvalidLimit(#[from] SearchLimitError),
    #[error("Failed to generate the query embedding")]
    EmbeddingProviderError(#[from] OpenAiEmbeddingsServiceError),
    #[error("The embeddings API returned an unusable embedding")]
    InvalidEmbedding(#[from] EmbeddingError),
    #[error("Failed to search documents")]
    StoreReadError(#[from] DocumentPostgresRepositoryError),
}

impl std::fmt::Debug for SearchDocumentsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SearchDocumentsError {
    fn status_code(&self) -> StatusCode {
        match self {
            SearchDocumentsError::InvalidQuery(_) | SearchDocumentsError::InvalidLimit(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            SearchDocumentsError::EmbeddingProviderError(_)
            | SearchDocumentsError::InvalidEmbedding(_)
            | SearchDocumentsError::StoreReadError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from search_documents handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let body = match self {
            SearchDocumentsError::InvalidQuery(_) => {
                json!({ "error": self.to_string(), "field": "query" })
            }
            SearchDocumentsError::InvalidLimit(_) => {
                json!({ "error": self.to_string(), "field": "k" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }
}
