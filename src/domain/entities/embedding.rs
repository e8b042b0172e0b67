use crate::helper::error_chain_fmt;

/// An embedding vector produced by the embeddings API
///
/// The vector dimension is fixed by the configured model. An empty vector has
/// no valid literal encoding, so it is rejected at parse time instead of
/// being silently serialized as `[]`.
#[derive(Debug, Clone)]
pub struct Embedding(Vec<f32>);

impl Embedding {
    pub fn parse(components: Vec<f32>) -> Result<Embedding, EmbeddingError> {
        if components.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding);
        }

        Ok(Self(components))
    }

    /// Encodes the vector as the store's textual literal: `[v1,v2,...,vn]`
    ///
    /// The literal is bound as a query parameter and cast with `::vector`
    /// on the store side.
    pub fn to_vector_literal(&self) -> String {
        let components: Vec<String> = self.0.iter().map(|v| v.to_string()).collect();
        format!("[{}]", components.join(","))
    }
}

impl AsRef<[f32]> for Embedding {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}

#[derive(thiserror::Error)]
pub enum EmbeddingError {
    #[error("An embedding must have at least one component")]
    EmptyEmbedding,
}

impl std::fmt::Debug for EmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
