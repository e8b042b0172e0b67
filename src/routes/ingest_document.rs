use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use anyhow::Context;
use serde_json::json;
use sqlx::PgPool;
use tracing::info;

use crate::domain::entities::document_content::{DocumentContent, DocumentContentError};
use crate::domain::entities::embedding::{Embedding, EmbeddingError};
use crate::domain::services::openai_embeddings_service::{
    OpenAiEmbeddingsService, OpenAiEmbeddingsServiceError,
};
use crate::helper::error_chain_fmt;
use crate::repositories::document_postgres_repository::{
    DocumentPostgresRepository, DocumentPostgresRepositoryError,
};

/// Embeds the given content and stores both in one transaction
///
/// With an `id` in the body, the document under that id is replaced if it
/// already exists. Without one, the database assigns a new id.
/// Validation happens before the embeddings API is called: an invalid body
/// costs no provider request and no store write.
#[tracing::instrument(
    name = "Ingest document",
    skip(pool, embeddings_service, document_repository, body)
)]
pub async fn ingest_document(
    pool: web::Data<PgPool>,
    embeddings_service: web::Data<OpenAiEmbeddingsService>,
    document_repository: web::Data<DocumentPostgresRepository>,
    body: web::Json<IngestDocumentBodyData>,
) -> Result<HttpResponse, IngestDocumentError> {
    info!(
        document_id = ?body.id,
        content_length = body.content.len(),
        "Ingesting document"
    );

    let content = DocumentContent::parse(&body.content)?;

    let embedding = embeddings_service.embed(content.as_ref()).await?;
    let embedding = Embedding::parse(embedding)?;
    let embedding_literal = embedding.to_vector_literal();

    let mut transaction = pool
        .begin()
        .await
        .context("Failed to acquire a Postgres connection from the pool")?;

    let document_id = document_repository
        .upsert_document(&mut transaction, body.id, content.as_ref(), &embedding_literal)
        .await?;

    transaction
        .commit()
        .await
        .context("Failed to commit SQL transaction to store the document")?;

    info!(document_id, "Successfully ingested document");
    Ok(HttpResponse::Ok().json(json!({ "id": document_id })))
}

#[derive(Debug, serde::Deserialize, serde::Serialize)]
pub struct IngestDocumentBodyData {
    pub content: String,
    pub id: Option<i64>,
}

#[derive(thiserror::Error)]
pub enum IngestDocumentError {
    #[error("{0}")]
    InvalidContent(#[from] DocumentContentError),
    #[error("Failed to generate the document embedding")]
    EmbeddingProviderError(#[from] OpenAiEmbeddingsServiceError),
    #[error("The embeddings API returned an unusable embedding")]
    InvalidEmbedding(#[from] EmbeddingError),
    #[error("Failed to store the document")]
    StoreWriteError(#[from] DocumentPostgresRepositoryError),
    #[error(transparent)]
    InternalError(#[from] anyhow::Error),
}

impl std::fmt::Debug for IngestDocumentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for IngestDocumentError {
    fn status_code(&self) -> StatusCode {
        match self {
            IngestDocumentError::InvalidContent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            IngestDocumentError::EmbeddingProviderError(_)
            | IngestDocumentError::InvalidEmbedding(_)
            | IngestDocumentError::StoreWriteError(_)
            | IngestDocumentError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from ingest_document handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        let body = match self {
            IngestDocumentError::InvalidContent(_) => {
                json!({ "error": self.to_string(), "field": "content" })
            }
            _ => json!({ "error": self.to_string() }),
        };

        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(body)
    }
}
