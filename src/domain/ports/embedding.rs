//! Embedding provider port for semantic vector generation.
//!
//! Defines the trait for embedding providers that convert text into
//! dense vector representations for semantic similarity search.

use async_trait::async_trait;
use thiserror::Error;

/// Errors an embedding backend can raise.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmbeddingError {
    /// Rate limit or quota exhausted. The only retryable class.
    #[error("Embedding quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Any other backend failure (network, auth, malformed payload, timeout).
    #[error("Embedding backend error: {0}")]
    EmbeddingBackendError(String),
}

impl EmbeddingError {
    /// Returns true if this error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::QuotaExceeded(_))
    }
}

/// Trait for embedding providers.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Provider name (e.g., "openai", "hash").
    fn name(&self) -> &'static str;

    /// Embedding dimension for this provider/model.
    fn dimension(&self) -> usize;

    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
