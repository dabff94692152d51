//! Shared fixtures for integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use pagewright::domain::models::{
    CompileOutput, CompletionBackend, EmbeddingBackend, GenerationStrategy,
};
use pagewright::{Config, DomainResult, Toolchain};

/// Marker the fake toolchain rejects.
pub const BROKEN: &str = "BROKEN";

/// Config that never touches the network or the working directory.
pub fn offline_config() -> Config {
    let mut config = Config::default();
    config.completion.backend = CompletionBackend::Scripted;
    config.embedding.backend = EmbeddingBackend::Hash;
    config.retry.initial_backoff_ms = 1;
    config.retry.max_backoff_ms = 2;
    config.retry.max_jitter_ms = 0;
    config
}

/// A strategy whose system prompt carries `marker`, so scripted rules can
/// address it directly.
pub fn marked_strategy(name: &str, marker: &str, priority: u32) -> GenerationStrategy {
    GenerationStrategy::new(name, "claude-3-5-sonnet-20241022")
        .with_priority(priority)
        .with_system_prompt(format!("Style marker {marker}."))
}

/// Compiles anything that does not contain [`BROKEN`].
#[derive(Debug, Default)]
pub struct MarkerToolchain {
    compiles: AtomicUsize,
}

impl MarkerToolchain {
    pub fn compiles(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Toolchain for MarkerToolchain {
    fn name(&self) -> &str {
        "marker"
    }

    fn file_extension(&self) -> &str {
        "tsx"
    }

    async fn compile(&self, path: &Path) -> DomainResult<CompileOutput> {
        self.compiles.fetch_add(1, Ordering::SeqCst);
        let source = tokio::fs::read_to_string(path).await?;
        Ok(if source.contains(BROKEN) {
            CompileOutput {
                success: false,
                exit_code: Some(2),
                diagnostics: format!("{}(1,1): error TS2304: Cannot find name '{BROKEN}'.", path.display()),
            }
        } else {
            CompileOutput {
                success: true,
                exit_code: Some(0),
                diagnostics: String::new(),
            }
        })
    }
}
