//! Pagewright project initialization
//!
//! Handles project setup:
//! - Configuration directory creation
//! - Default config file creation
//! - Empty pattern store creation

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration template content
const DEFAULT_CONFIG_TEMPLATE: &str = r#"# Pagewright Configuration
# Override settings by editing this file or setting environment variables
# with PAGEWRIGHT_ prefix
#
# Example environment variables:
#   export PAGEWRIGHT_LOGGING__LEVEL=debug
#   export PAGEWRIGHT_RAG__ENABLED=false
#   export PAGEWRIGHT_COMPLETION__API_KEY=sk-...

# Logging configuration
logging:
  # Log level: trace, debug, info, warn, error
  level: "info"

  # Log format: json, pretty
  format: "pretty"

# Completion service
completion:
  # anthropic or scripted (offline)
  backend: "anthropic"
  model: "claude-3-5-sonnet-20241022"
  timeout_secs: 120
  requests_per_second: 10

# Embedding backend
embedding:
  # openai or hash (offline, deterministic)
  backend: "openai"
  model: "text-embedding-3-small"
  timeout_secs: 30

# Retry policy for rate-limited embedding calls
retry:
  max_attempts: 5
  initial_backoff_ms: 1000
  max_backoff_ms: 30000
  max_jitter_ms: 1000

# Knowledge base
rag:
  # Retrieval switch; patterns are still recorded when disabled
  enabled: true
  similar_limit: 3
  store_path: ".pagewright/patterns.json"

# Multi-strategy generation
generation:
  # text or visual; vision models are rejected in text mode
  mode: "text"
  preview_chars: 500

# Compile-and-repair loop
validation:
  in_fallback_plan: false
  program: "npx"
  args: ["--yes", "tsc", "--noEmit", "--jsx", "preserve", "{file}"]
  file_extension: "tsx"
  max_retries: 2
  timeout_secs: 60

orchestrator:
  use_planner: true
"#;

/// Setup paths and directories
pub struct SetupPaths {
    pub config_dir: PathBuf,
    pub config_file: PathBuf,
    pub store_file: PathBuf,
}

impl SetupPaths {
    /// Get setup paths for the current directory
    pub fn new() -> Result<Self> {
        let current_dir = std::env::current_dir().context("Failed to get current directory")?;
        Ok(Self::in_dir(&current_dir))
    }

    /// Setup paths rooted at an arbitrary project directory
    pub fn in_dir(root: &Path) -> Self {
        let config_dir = root.join(".pagewright");
        Self {
            config_file: config_dir.join("config.yaml"),
            store_file: config_dir.join("patterns.json"),
            config_dir,
        }
    }

    /// Check if Pagewright is already initialized
    pub fn is_initialized(&self) -> bool {
        self.config_file.exists() && self.store_file.exists()
    }
}

/// Create the configuration directory
pub fn create_config_dir(paths: &SetupPaths) -> Result<()> {
    fs::create_dir_all(&paths.config_dir).context("Failed to create config directory")?;
    Ok(())
}

/// Create the default configuration file
pub fn create_config_file(paths: &SetupPaths, force: bool) -> Result<()> {
    if paths.config_file.exists() && !force {
        return Ok(());
    }

    fs::write(&paths.config_file, DEFAULT_CONFIG_TEMPLATE)
        .context("Failed to write default config file")?;

    Ok(())
}

/// Create an empty pattern store; an existing store is never truncated
pub fn create_pattern_store(paths: &SetupPaths) -> Result<()> {
    if paths.store_file.exists() {
        return Ok(());
    }

    fs::write(&paths.store_file, "[]\n").context("Failed to create pattern store")?;
    Ok(())
}

/// Run every setup step
pub fn initialize(paths: &SetupPaths, force: bool) -> Result<()> {
    create_config_dir(paths)?;
    create_config_file(paths, force)?;
    create_pattern_store(paths)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::Config;

    #[test]
    fn test_template_parses_as_config() {
        let config: Config = serde_yaml::from_str(DEFAULT_CONFIG_TEMPLATE).unwrap();
        assert_eq!(config.validation.max_retries, 2);
        assert!(config.rag.enabled);
        crate::infrastructure::config::ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn test_initialize_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SetupPaths::in_dir(dir.path());
        assert!(!paths.is_initialized());

        initialize(&paths, false).unwrap();
        assert!(paths.is_initialized());
        assert_eq!(fs::read_to_string(&paths.store_file).unwrap().trim(), "[]");
    }

    #[test]
    fn test_initialize_keeps_existing_store() {
        let dir = tempfile::tempdir().unwrap();
        let paths = SetupPaths::in_dir(dir.path());
        create_config_dir(&paths).unwrap();
        fs::write(&paths.store_file, "[{\"x\":1}]").unwrap();

        initialize(&paths, true).unwrap();
        assert_eq!(fs::read_to_string(&paths.store_file).unwrap(), "[{\"x\":1}]");
    }
}
