use serde::Serialize;

/// One search result: a stored document and its distance to the query embedding
///
/// `distance` comes from the store's cosine distance operator: smaller means
/// more similar. Rows are returned in the store's ranking order.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DocumentHit {
    pub id: i64,
    pub content: String,
    pub distance: f64,
}
