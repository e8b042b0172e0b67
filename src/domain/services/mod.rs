pub mod openai_embeddings_service;
