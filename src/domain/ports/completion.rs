//! Completion service port.
//!
//! The only way the core talks to a language model: a stateless
//! prompt-in, text-out call. Vendors are adapters behind this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// System prompt establishing the model's role.
    pub system_prompt: String,
    /// The user turn.
    pub user_prompt: String,
    /// Model identifier understood by the backend.
    pub model: String,
    /// Sampling temperature (0.0-1.0).
    pub temperature: f32,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, system_prompt: impl Into<String>, user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_prompt: user_prompt.into(),
            model: model.into(),
            temperature: 0.3,
            max_tokens: 2048,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// Failure modes a completion backend exposes to the core.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompletionError {
    /// Quota or rate limit hit (HTTP 429).
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The call exceeded its time bound.
    #[error("Completion request timed out")]
    Timeout,

    /// The backend answered but the payload was unusable.
    #[error("Malformed completion output: {0}")]
    MalformedOutput(String),

    /// Credentials or endpoint missing. Fatal at startup.
    #[error("Completion service not configured: {0}")]
    NotConfigured(String),

    /// Any other backend failure.
    #[error("Completion backend error: {0}")]
    Backend(String),
}

impl CompletionError {
    /// Returns true if this error is transient and may be retried by the caller.
    pub fn is_transient(&self) -> bool {
        matches!(self, CompletionError::RateLimited(_) | CompletionError::Timeout)
    }
}

/// Text completion capability.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Backend name for diagnostics (e.g., "anthropic", "scripted").
    fn name(&self) -> &'static str;

    /// Run a single completion and return the raw text.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionError>;
}
