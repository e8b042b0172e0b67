use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::configuration::EmbeddingsClientSettings;
use crate::helper::error_chain_fmt;

/// Service to generate embeddings from a text content, using an
/// OpenAI-compatible embeddings API.
///
/// The configured model fixes the dimension of every returned vector.
///
/// Question: should it be considered a "repository" ?
pub struct OpenAiEmbeddingsService {
    http_client: Client,
    base_url: String,
    api_key: Secret<String>,
    model: String,
}

impl OpenAiEmbeddingsService {
    pub fn new(settings: EmbeddingsClientSettings) -> Self {
        Self {
            http_client: Client::new(),
            base_url: settings.base_url,
            api_key: settings.api_key,
            model: settings.model,
        }
    }

    /// Name of the model every embedding is generated with
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// Requests one embedding for `text` and returns the provider's first
    /// result vector
    ///
    /// No retry: a network failure, a non-success status or a response
    /// without any embedding is surfaced to the caller as-is.
    #[tracing::instrument(name = "Generate embedding", skip(self, text))]
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, OpenAiEmbeddingsServiceError> {
        let request = EmbeddingsRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .http_client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response.text().await.unwrap_or_default();
            return Err(OpenAiEmbeddingsServiceError::ProviderError { status, message });
        }

        let response: EmbeddingsResponse = response.json().await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or(OpenAiEmbeddingsServiceError::MissingEmbedding)?
            .embedding;

        debug!(dimension = embedding.len(), "Generated embedding");

        Ok(embedding)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingsData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsData {
    embedding: Vec<f32>,
}

#[derive(thiserror::Error)]
pub enum OpenAiEmbeddingsServiceError {
    #[error("Failed to reach the embeddings API: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Embeddings API returned {status}: {message}")]
    ProviderError { status: StatusCode, message: String },
    #[error("Embeddings API response contained no embedding")]
    MissingEmbedding,
}

impl std::fmt::Debug for OpenAiEmbeddingsServiceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
