use sqlx::PgExecutor;

use crate::domain::entities::document::DocumentHit;
use crate::helper::error_chain_fmt;

/// Document repository implemented using Postgres with the pgvector extension
///
/// Embeddings are passed around as textual vector literals and cast with
/// `::vector` inside the statements. The extension has no native sqlx type,
/// so the queries are built with runtime binds instead of the `query!` macros.
pub struct DocumentPostgresRepository {}

impl Default for DocumentPostgresRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentPostgresRepository {
    pub fn new() -> Self {
        Self {}
    }

    /// Inserts a new document, or replaces `content` and `embedding` when a
    /// caller-supplied id already exists
    ///
    /// # Returns
    /// The id under which the document is stored: the caller-supplied one,
    /// or the one generated by the database sequence.
    #[tracing::instrument(
        name = "Upserting document in database",
        skip(self, db_executor, content, embedding_literal)
    )]
    pub async fn upsert_document(
        &self,
        db_executor: impl PgExecutor<'_>,
        id: Option<i64>,
        content: &str,
        embedding_literal: &str,
    ) -> Result<i64, DocumentPostgresRepositoryError> {
        let stored_id = match id {
            None => {
                sqlx::query_scalar::<_, i64>(
                    r#"
    INSERT INTO documents (content, embedding)
    VALUES ($1, $2::vector)
    RETURNING id
                    "#,
                )
                .bind(content)
                .bind(embedding_literal)
                .fetch_one(db_executor)
                .await?
            }
            Some(id) => {
                sqlx::query_scalar::<_, i64>(
                    r#"
    INSERT INTO documents (id, content, embedding)
    VALUES ($1, $2, $3::vector)
    ON CONFLICT (id) DO UPDATE
    SET content = EXCLUDED.content, embedding = EXCLUDED.embedding
    RETURNING id
                    "#,
                )
                .bind(id)
                .bind(content)
                .bind(embedding_literal)
                .fetch_one(db_executor)
                .await?
            }
        };

        Ok(stored_id)
    }

    /// Returns the `limit` documents closest to the query embedding,
    /// ordered by increasing cosine distance
    #[tracing::instrument(
        name = "Searching documents in database",
        skip(self, db_executor, query_embedding_literal)
    )]
    pub async fn search_documents(
        &self,
        db_executor: impl PgExecutor<'_>,
        query_embedding_literal: &str,
        limit: i64,
    ) -> Result<Vec<DocumentHit>, DocumentPostgresRepositoryError> {
        let hits = sqlx::query_as::<_, DocumentHit>(
            r#"
    SELECT id, content, (embedding <=> $1::vector) AS distance
    FROM documents
    ORDER BY embedding <=> $1::vector
    LIMIT $2
            "#,
        )
        .bind(query_embedding_literal)
        .bind(limit)
        .fetch_all(db_executor)
        .await?;

        Ok(hits)
    }
}

#[derive(thiserror::Error)]
pub enum DocumentPostgresRepositoryError {
    #[error(transparent)]
    DBError(#[from] sqlx::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl std::fmt::Debug for DocumentPostgresRepositoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
