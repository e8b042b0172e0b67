use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::domain::services::openai_embeddings_service::OpenAiEmbeddingsService;

/// Reports that the service is alive, and which embedding model it runs with
#[tracing::instrument(name = "Health check handler", skip(embeddings_service))]
pub async fn health_check(embeddings_service: web::Data<OpenAiEmbeddingsService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "ok": true,
        "model": embeddings_service.model_name(),
    }))
}
