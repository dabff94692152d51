//! External command toolchain adapter.
//!
//! Runs a configured program against an artifact file. The `{file}`
//! placeholder in the argument list is replaced by the artifact path; when
//! no argument carries the placeholder the path is appended. Output streams
//! are captured and combined into one diagnostic string.

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::domain::errors::{DomainResult, ValidationError};
use crate::domain::models::{CompileOutput, ValidationConfig};
use crate::domain::ports::Toolchain;

const FILE_PLACEHOLDER: &str = "{file}";

/// Toolchain that shells out to a compiler or type checker.
#[derive(Debug, Clone)]
pub struct CommandToolchain {
    program: String,
    args: Vec<String>,
    file_extension: String,
    timeout: Duration,
}

impl CommandToolchain {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            file_extension: "tsx".to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::new(config.program.clone(), config.args.clone())
            .with_file_extension(config.file_extension.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs))
    }

    pub fn with_file_extension(mut self, extension: impl Into<String>) -> Self {
        self.file_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn build_args(&self, path: &Path) -> Vec<String> {
        let file = path.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(FILE_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(FILE_PLACEHOLDER, &file)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(file.into_owned());
        }
        args
    }
}

#[async_trait]
impl Toolchain for CommandToolchain {
    fn name(&self) -> &str {
        &self.program
    }

    fn file_extension(&self) -> &str {
        &self.file_extension
    }

    #[instrument(skip(self), fields(program = %self.program))]
    async fn compile(&self, path: &Path) -> DomainResult<CompileOutput> {
        let args = self.build_args(path);

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ValidationError::ToolchainUnavailable(format!(
                    "Failed to start '{}': {}",
                    self.program, e
                ))
            })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                ValidationError::ToolchainUnavailable(format!(
                    "'{}' timed out after {}s",
                    self.program,
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| {
                ValidationError::ToolchainUnavailable(format!(
                    "Failed to wait for '{}': {}",
                    self.program, e
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let diagnostics = [stdout.trim(), stderr.trim()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n");

        debug!(
            exit_code = ?output.status.code(),
            success = output.status.success(),
            "Toolchain finished"
        );

        Ok(CompileOutput {
            success: output.status.success(),
            exit_code: output.status.code(),
            diagnostics,
        })
    }
}
