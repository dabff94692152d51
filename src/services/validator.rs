//! Compile-and-repair loop for generated markup.
//!
//! Each attempt writes the code to an isolated temporary file, runs the
//! toolchain on it and removes the file. A failed compile sends the code and
//! the raw diagnostics back to the model for a patch. At most
//! `max_retries + 1` compiles run before the artifact is declared
//! unrepairable.

use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{DomainError, DomainResult, ValidationError};
use crate::domain::models::{CompletionConfig, ValidationReport, ValidationResult};
use crate::domain::ports::{CompletionRequest, CompletionService, Toolchain};
use crate::services::code_extraction::extract_code;

pub const DEFAULT_MAX_RETRIES: u32 = 2;

const REPAIR_SYSTEM_PROMPT: &str = "You fix compiler errors in generated UI code. Change only what \
the diagnostics require. Return only the corrected code.";

pub struct Validator {
    toolchain: Arc<dyn Toolchain>,
    completion: Arc<dyn CompletionService>,
    model: String,
    max_retries: u32,
}

impl Validator {
    pub fn new(toolchain: Arc<dyn Toolchain>, completion: Arc<dyn CompletionService>) -> Self {
        Self {
            toolchain,
            completion,
            model: CompletionConfig::default().model,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Compile `code` once.
    pub async fn compile(&self, code: &str) -> DomainResult<ValidationResult> {
        let artifact = tempfile::Builder::new()
            .prefix("pagewright-")
            .suffix(&format!(".{}", self.toolchain.file_extension()))
            .tempfile()?;
        tokio::fs::write(artifact.path(), code).await?;

        let output = self.toolchain.compile(artifact.path()).await;
        if let Err(e) = artifact.close() {
            warn!(error = %e, "Failed to remove compile artifact");
        }

        Ok(output?.into())
    }

    /// Return code that compiles, repairing it as needed.
    pub async fn validate_and_fix(&self, code: &str) -> DomainResult<String> {
        Ok(self.validate_and_fix_report(code).await?.code)
    }

    /// Like [`validate_and_fix`](Self::validate_and_fix), with attempt details.
    #[instrument(skip(self, code), fields(toolchain = %self.toolchain.name()))]
    pub async fn validate_and_fix_report(&self, code: &str) -> DomainResult<ValidationReport> {
        let max_attempts = self.max_retries + 1;
        let mut current = code.to_string();
        let mut attempt = 0;

        loop {
            attempt += 1;
            let result = self.compile(&current).await?;
            if result.is_valid {
                info!(attempts = attempt, "Artifact compiled");
                return Ok(ValidationReport {
                    code: current,
                    attempts: attempt,
                    repaired: attempt > 1,
                });
            }

            let diagnostics = result.error.unwrap_or_default();
            if attempt >= max_attempts {
                warn!(attempts = attempt, "Repair ceiling reached");
                return Err(DomainError::Validation(ValidationError::UnrepairableArtifact {
                    attempts: attempt,
                    last_error: diagnostics,
                }));
            }

            debug!(attempt, chars = diagnostics.len(), "Compile failed, requesting repair");
            current = self.repair(&current, &diagnostics).await?;
        }
    }

    async fn repair(&self, code: &str, diagnostics: &str) -> DomainResult<String> {
        let request = CompletionRequest::new(
            self.model.clone(),
            REPAIR_SYSTEM_PROMPT,
            format!(
                "Code:\n```\n{code}\n```\n\nCompiler output:\n{diagnostics}\n\n\
                 Fix the errors and return only the corrected code."
            ),
        )
        .with_temperature(0.0)
        .with_max_tokens(4096);

        let response = self.completion.complete(request).await?;
        let patched = extract_code(&response).code;
        if patched.trim().is_empty() {
            warn!("Repair response held no code, retrying with previous version");
            return Ok(code.to_string());
        }
        Ok(patched)
    }
}
