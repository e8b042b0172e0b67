use std::net::TcpListener;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use actix_web::{web, App, HttpResponse, HttpServer};
use chrono::Utc;
use once_cell::sync::Lazy;
use secrecy::Secret;
use semantic_search_service::{
    configuration::{get_configuration, DatabaseSettings},
    startup::{get_connection_pool, Application},
    telemetry::{get_tracing_subscriber, init_tracing_subscriber},
};
use serde_json::json;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

/// Dimension of the `documents.embedding` column
pub const EMBEDDING_DIMENSION: usize = 1536;

// Ensures that the `tracing` stack is only initialized once using `once_cell`
static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    // We cannot assign the output of `get_tracing_subscriber` to a variable based on the value of `TEST_LOG`
    // because the sink is part of the type returned by `get_tracing_subscriber`, therefore they are not the
    // same type. We could work around it, but this is the most straight-forward way of moving forward.
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber);
    } else {
        let subscriber =
            get_tracing_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber);
    };
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    /// Database connection used to assert checks thanks to db queries
    pub db_pool: PgPool,
    /// Local stand-in for the embeddings API
    pub embeddings_provider: FakeEmbeddingsProvider,
}

/// Stand-in for the embeddings API: an actix-web server on a random local
/// port, serving `POST /embeddings` with deterministic vectors
///
/// Identical input text always produces the identical embedding, so a search
/// for a document's exact content ranks that document first.
pub struct FakeEmbeddingsProvider {
    pub base_url: String,
    calls: Arc<AtomicUsize>,
}

impl FakeEmbeddingsProvider {
    /// Number of embedding requests the stand-in has served
    pub fn nb_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[derive(serde::Deserialize)]
struct FakeEmbeddingsBodyData {
    input: String,
}

async fn fake_embeddings(
    calls: web::Data<AtomicUsize>,
    body: web::Json<FakeEmbeddingsBodyData>,
) -> HttpResponse {
    calls.fetch_add(1, Ordering::SeqCst);

    let embedding = deterministic_embedding(&body.input, EMBEDDING_DIMENSION);
    HttpResponse::Ok().json(json!({ "data": [{ "embedding": embedding, "index": 0 }] }))
}

/// Maps a text to a pseudo-random vector, deterministically
///
/// FNV-hashes the text into a xorshift state and draws `dimension`
/// components in [-1, 1).
fn deterministic_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut state = text.bytes().fold(0xcbf29ce484222325u64, |hash, byte| {
        (hash ^ byte as u64).wrapping_mul(0x100000001b3)
    });

    (0..dimension)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state % 2000) as f32 / 1000.0 - 1.0
        })
        .collect()
}

async fn spawn_fake_embeddings_provider() -> FakeEmbeddingsProvider {
    let calls = Arc::new(AtomicUsize::new(0));
    let calls_data = web::Data::from(calls.clone());

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind a random port");
    let port = listener
        .local_addr()
        .expect("Failed to get the fake provider address")
        .port();

    let server = HttpServer::new(move || {
        App::new()
            .route("/embeddings", web::post().to(fake_embeddings))
            .app_data(calls_data.clone())
    })
    .listen(listener)
    .expect("Failed to listen on the fake provider port")
    .workers(1)
    .run();

    let _ = tokio::spawn(server);

    FakeEmbeddingsProvider {
        base_url: format!("http://127.0.0.1:{}", port),
        calls,
    }
}

/// Launches the server as a background task, wired to a fresh database and
/// a fake embeddings provider
///
/// When a tokio runtime is shut down all tasks spawned on it are dropped.
/// tokio::test spins up a new runtime at the beginning of each test case and they shut down at the end of each test case.
/// Therefore no need to implement any clean up logic to avoid leaking resources between test runs
pub async fn spawn_app() -> TestApp {
    spawn_app_with_database(true).await
}

/// Same as `spawn_app` but skips database creation and migration
///
/// The connection pool is lazy: tests that never reach the store (validation
/// failures, health check) run without a Postgres server.
pub async fn spawn_app_without_database() -> TestApp {
    spawn_app_with_database(false).await
}

async fn spawn_app_with_database(set_up_db: bool) -> TestApp {
    // The first time `initialize` is invoked the code in `TRACING` is executed.
    // All other invocations will instead skip execution.
    Lazy::force(&TRACING);

    let embeddings_provider = spawn_fake_embeddings_provider().await;

    // Randomizes configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Uses a different database for each test case
        c.database.database_name = format!(
            "test_{}_{}",
            Utc::now().format("%Y-%m-%d_%H-%M-%S"),
            Uuid::new_v4()
        );
        // Uses a random OS port: port 0 is special-cased at the OS level:
        // trying to bind port 0 will trigger an OS scan for an available port which will then be bound to the application.
        c.application.port = 0;

        // Targets the local stand-in instead of the real embeddings API
        c.embeddings.base_url = embeddings_provider.base_url.clone();
        c.embeddings.api_key = Secret::new("test-api-key".to_string());

        c
    };

    // Creates and migrates the database
    if set_up_db {
        set_up_database(&configuration.database).await;
    }

    // Only one actix-web worker is needed for integration tests
    let application = Application::build(configuration.clone(), Some(1))
        .await
        .expect("Failed to build application.");

    let application_port = application.port();

    // Launches the application as a background task
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        db_pool: get_connection_pool(&configuration.database),
        embeddings_provider,
    }
}

/// Creates and migrates a database for integration test
async fn set_up_database(config: &DatabaseSettings) -> PgPool {
    // Creates database
    let mut connection = PgConnection::connect_with(&config.without_db())
        .await
        .expect("Failed to connect to Postgres");

    connection
        .execute(format!(r#"CREATE DATABASE "{}";"#, config.database_name).as_str())
        .await
        .expect("Failed to create database.");

    info!("Created database: {}", config.database_name);

    let connection_pool = PgPool::connect_with(config.with_db())
        .await
        .expect("Failed to connect to Postgres.");

    // Migrates database
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database");

    info!("Migration done for database: {}", config.database_name);

    connection_pool
}
