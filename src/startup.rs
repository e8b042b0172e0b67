use actix_web::{
    dev::Server,
    error::InternalError,
    http::header::ContentType,
    web::{self, Data},
    App, HttpResponse, HttpServer,
};
use serde_json::json;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::net::TcpListener;
use tracing::info;
use tracing_actix_web::TracingLogger;

use crate::{
    configuration::{DatabaseSettings, Settings},
    domain::services::openai_embeddings_service::OpenAiEmbeddingsService,
    repositories::document_postgres_repository::DocumentPostgresRepository,
    routes::{health_check, ingest_document, search_documents},
};

/// Holds the newly built server, and some useful properties
pub struct Application {
    server: Server,
    port: u16,
}

#[derive(thiserror::Error, Debug)]
pub enum ApplicationBuildError {
    #[error(transparent)]
    IOError(#[from] std::io::Error),
}

impl Application {
    /// # Parameters
    /// - nb_workers: number of actix-web workers
    ///   if `None`, the number of available physical CPUs is used as the worker count.
    #[tracing::instrument(name = "Building application")]
    pub async fn build(
        settings: Settings,
        nb_workers: Option<usize>,
    ) -> Result<Self, ApplicationBuildError> {
        let connection_pool = get_connection_pool(&settings.database);

        let address = format!(
            "{}:{}",
            settings.application.host, settings.application.port
        );
        let listener = TcpListener::bind(address)?;
        let port = listener.local_addr()?.port();

        let embeddings_service = OpenAiEmbeddingsService::new(settings.embeddings);
        let document_repository = DocumentPostgresRepository::new();

        let server = run(
            listener,
            nb_workers,
            connection_pool,
            embeddings_service,
            document_repository,
        )?;

        Ok(Self { server, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// This function only returns when the application is stopped
    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        info!("Running server ...");
        self.server.await
    }
}

/// listener: the consumer binds their own port
///
/// TracingLogger middleware: helps collecting telemetry data.
/// It generates a unique identifier for each incoming request: `request_id`.
///
/// # Parameters
/// - nb_workers: number of actix-web workers
///   if `None`, the number of available physical CPUs is used as the worker count.
pub fn run(
    listener: TcpListener,
    nb_workers: Option<usize>,
    db_pool: PgPool,
    embeddings_service: OpenAiEmbeddingsService,
    document_repository: DocumentPostgresRepository,
) -> Result<Server, std::io::Error> {
    // Wraps the connection to a db in smart pointers
    let db_pool = Data::new(db_pool);

    // Wraps collaborators in a `actix_web::Data` (`Arc`) to be able to register them
    // and access them from handlers. They are shared among all workers.
    let embeddings_service = Data::new(embeddings_service);
    let document_repository = Data::new(document_repository);

    // `move` to capture variables from the surrounding environment
    let server = HttpServer::new(move || {
        info!("Starting actix-web worker");

        App::new()
            .wrap(TracingLogger::default())
            .route("/", web::get().to(health_check))
            .route("/ingest", web::post().to(ingest_document))
            .route("/search", web::post().to(search_documents))
            .app_data(json_config())
            // Used to create SQL transaction
            .app_data(db_pool.clone())
            .app_data(embeddings_service.clone())
            .app_data(document_repository.clone())
    })
    .listen(listener)?;

    // If no workers were set, use the actix-web settings (number of workers = number of physical CPUs)
    if let Some(nb_workers) = nb_workers {
        return Ok(server.workers(nb_workers).run());
    }

    // No await
    Ok(server.run())
}

/// Maps body deserialization failures to 422 instead of actix-web's default 400
///
/// A missing or mistyped field is a validation error like any other, so it
/// gets the same status and the same `{"error", "field"}` body shape as the
/// domain-level checks. The serde message is forwarded as the diagnostic.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|error, req| {
        let message = error.to_string();
        let field = rejected_body_field(req.path(), &message);

        let mut body = json!({ "error": message });
        if let Some(field) = field {
            body["field"] = json!(field);
        }

        let response = HttpResponse::UnprocessableEntity()
            .insert_header(ContentType::json())
            .json(body);

        InternalError::from_response(error, response).into()
    })
}

/// Recovers the offending body field from a deserialization failure
///
/// serde_json only names the field for missing/duplicate ones. Type
/// mismatches carry the expected type instead, which is enough here: each
/// body holds exactly one string field and one integer field.
fn rejected_body_field(path: &str, message: &str) -> Option<&'static str> {
    let (string_field, integer_field) = match path {
        "/ingest" => ("content", "id"),
        "/search" => ("query", "k"),
        _ => return None,
    };

    let message = message
        .strip_prefix("Json deserialize error: ")
        .unwrap_or(message);

    if message.starts_with("missing field `") || message.starts_with("duplicate field `") {
        let named = message.split('`').nth(1)?;
        if named == string_field {
            return Some(string_field);
        }
        if named == integer_field {
            return Some(integer_field);
        }
        return None;
    }

    if message.contains("expected i64") {
        return Some(integer_field);
    }
    if message.contains("expected a string") {
        return Some(string_field);
    }

    None
}

// Or should we keep a clone of the pool connection in `Application` ?
pub fn get_connection_pool(settings: &DatabaseSettings) -> PgPool {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(settings.with_db())
}
