pub mod document_postgres_repository;
