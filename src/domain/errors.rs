//! Domain errors for the Pagewright generation pipeline.

use thiserror::Error;

use crate::domain::ports::completion::CompletionError;
use crate::domain::ports::embedding::EmbeddingError;

/// Domain-level errors that can occur in the Pagewright system.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Knowledge base is not initialized")]
    NotInitialized,
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::SerializationError(err.to_string())
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::Storage(err.to_string())
    }
}

/// Errors raised by the multi-strategy generator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Every configured strategy failed.
    #[error("No viable generation: all {attempted} strategies failed ({})", .failures.join("; "))]
    NoViableGeneration {
        attempted: usize,
        failures: Vec<String>,
    },

    /// A vision-capable model was configured while running in text mode.
    #[error("Strategy '{strategy}' references vision model '{model_id}' in text mode")]
    VisionModelInTextMode { strategy: String, model_id: String },

    /// No strategies were configured at all.
    #[error("No generation strategies configured")]
    NoStrategies,
}

/// Errors raised by the validate-and-repair loop.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The repair ceiling was reached while the artifact still failed to compile.
    #[error("Artifact still invalid after {attempts} compile attempts: {last_error}")]
    UnrepairableArtifact { attempts: u32, last_error: String },

    /// The external toolchain could not be run at all.
    #[error("Toolchain unavailable: {0}")]
    ToolchainUnavailable(String),
}

impl GenerationError {
    /// Configuration errors must surface at startup instead of being downgraded.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            GenerationError::VisionModelInTextMode { .. } | GenerationError::NoStrategies
        )
    }
}
