//! Validation models for the compile-and-repair loop.

use serde::{Deserialize, Serialize};

/// Pass/fail state of one compile attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error: Some(error.into()),
        }
    }
}

/// Summary of a completed validate-and-fix run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// The code that compiled (possibly repaired).
    pub code: String,
    /// Number of compile attempts made.
    pub attempts: u32,
    /// Whether any repair was applied.
    pub repaired: bool,
}

/// Raw result of running the external toolchain once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub diagnostics: String,
}

impl From<CompileOutput> for ValidationResult {
    fn from(output: CompileOutput) -> Self {
        if output.success {
            ValidationResult::valid()
        } else if output.diagnostics.trim().is_empty() {
            ValidationResult::invalid(format!(
                "Toolchain exited with status {}",
                output
                    .exit_code
                    .map_or_else(|| "unknown".to_string(), |c| c.to_string())
            ))
        } else {
            ValidationResult::invalid(output.diagnostics)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_output_conversion() {
        let ok: ValidationResult = CompileOutput {
            success: true,
            exit_code: Some(0),
            diagnostics: "warning: unused".to_string(),
        }
        .into();
        assert!(ok.is_valid);
        assert!(ok.error.is_none());

        let silent: ValidationResult = CompileOutput {
            success: false,
            exit_code: Some(2),
            diagnostics: "  ".to_string(),
        }
        .into();
        assert_eq!(silent.error.as_deref(), Some("Toolchain exited with status 2"));
    }
}
