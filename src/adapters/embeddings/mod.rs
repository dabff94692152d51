//! Embedding provider adapters.
//!
//! The deterministic hash provider lives with the port
//! (`domain::ports::hash_embedding`) since the embedding cache also uses it
//! for degraded-mode vectors.

pub mod openai;

pub use openai::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
