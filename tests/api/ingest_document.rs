use crate::helpers::{spawn_app, spawn_app_without_database};
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
async fn ingest_without_content_is_rejected_before_any_embedding_call() {
    // Arranges
    let app = spawn_app_without_database().await;
    let client = reqwest::Client::new();

    // Acts
    let response = client
        .post(&format!("{}/ingest", &app.address))
        .json(&json!({ "id": 1 }))
        .send()
        .await
        .expect("Failed to execute request");

    // Asserts
    assert_eq!(422, response.status().as_u16());

    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["field"], json!("content"));

    // The embeddings API must not have been called
    assert_eq!(0, app.embeddings_provider.nb_calls());
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_with_an_empty_content_is_rejected_before_any_embedding_call() {
    // Arranges
    let app = spawn_app_without_database().await;
    let client = reqwest::Client::new();

    // Acts
    let response = client
        .post(&format!("{}/ingest", &app.address))
        .json(&json!({ "content": "", "id": 1 }))
        .send()
        .await
        .expect("Failed to execute request");

    // Asserts
    assert_eq!(422, response.status().as_u16());

    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["field"], json!("content"));

    assert_eq!(0, app.embeddings_provider.nb_calls());
}

#[tokio::test(flavor = "multi_thread")]
async fn ingest_with_a_non_integer_id_is_rejected_before_any_embedding_call() {
    // Arranges
    let app = spawn_app_without_database().await;
    let client = reqwest::Client::new();

    // Acts
    let response = client
        .post(&format!("{}/ingest", &app.address))
        .json(&json!({ "content": "some text", "id": "5" }))
        .send()
        .await
        .expect("Failed to execute request");

    // Asserts
    assert_eq!(422, response.status().as_u16());

    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    assert_eq!(body["field"], json!("id"));

    assert_eq!(0, app.embeddings_provider.nb_calls());
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs a running Postgres with the pgvector extension"]
async fn a_valid_document_is_persisted_and_its_id_returned() {
    // Arranges
    let app = spawn_app().await;
    let client = reqwest::Client::new();
    let content = "Postgres with pgvector enables vector search";

    // Acts
    let response = client
        .post(&format!("{}/ingest", &app.address))
        .json(&json!({ "content": content }))
        .send()
        .await
        .expect("Failed to execute request");

    // Asserts the API response
    assert_eq!(200, response.status().as_u16());

    let body: serde_json::Value = response.json().await.expect("Failed to parse response body");
    let returned_id = body["id"].as_i64().expect("id is not an integer");

    // Asserts the document has been persisted - only 1 document should exist
    let (stored_id, stored_content) =
        sqlx::query_as::<_, (i64, String)>(r#"SELECT id, content FROM documents"#)
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to fetch the stored document");

    assert_eq!(returned_id, stored_id);
    assert_eq!(content, stored_content);
}

#[tokio::test(flavor = "multi_thread")]
#[ignore = "needs a running Postgres with the pgvector extension"]
async fn ingesting_twice_under_the_same_id_keeps_one_document_with_the_latest_content() {
    // Arranges
    let app = spawn_app().await;
    let client = reqwest::Client::new();

    // Acts: same explicit id, different content
    let first_response = client
        .post(&format!("{}/ingest", &app.address))
        .json(&json!({ "id": 101, "content": "first version" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, first_response.status().as_u16());

    let second_response = client
        .post(&format!("{}/ingest", &app.address))
        .json(&json!({ "id": 101, "content": "second version" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(200, second_response.status().as_u16());

    let body: serde_json::Value = second_response
        .json()
        .await
        .expect("Failed to parse response body");
    assert_eq!(body["id"], json!(101));

    // Asserts: exactly one document under that id, holding the latest content
    let documents = sqlx::query_as::<_, (i64, String)>(r#"SELECT id, content FROM documents"#)
        .fetch_all(&app.db_pool)
        .await
        .expect("Failed to fetch the stored documents");

    assert_eq!(1, documents.len());
    assert_eq!((101, "second version".to_string()), documents[0]);
}
