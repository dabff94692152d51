use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::domain::models::GenerationMode;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid requests_per_second: {0}. Must be at least 1")]
    InvalidRateLimit(u32),

    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    #[error(
        "Invalid backoff configuration: initial_backoff_ms ({0}) must not exceed max_backoff_ms ({1})"
    )]
    InvalidBackoff(u64, u64),

    #[error("Knowledge base store path cannot be empty")]
    EmptyStorePath,

    #[error("Invalid similar_limit: {0}. Must be at least 1")]
    InvalidSimilarLimit(usize),

    #[error("No generation strategies configured")]
    NoStrategies,

    #[error("Strategy '{0}' references a vision model but generation mode is text")]
    VisionModelInTextMode(String),

    #[error("Validation program cannot be empty")]
    EmptyValidationProgram,

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .pagewright/config.yaml (project config, created by init)
    /// 3. .pagewright/local.yaml (project local overrides, optional)
    /// 4. Environment variables (PAGEWRIGHT_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".pagewright/config.yaml"))
            .merge(Yaml::file(".pagewright/local.yaml"))
            .merge(Env::prefixed("PAGEWRIGHT_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring env overrides
    pub fn load_from_file(path: impl AsRef<std::path::Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("PAGEWRIGHT_").split("__"))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        if config.completion.requests_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit(
                config.completion.requests_per_second,
            ));
        }

        if config.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(config.retry.max_attempts));
        }

        if config.retry.initial_backoff_ms > config.retry.max_backoff_ms {
            return Err(ConfigError::InvalidBackoff(
                config.retry.initial_backoff_ms,
                config.retry.max_backoff_ms,
            ));
        }

        if config.rag.store_path.trim().is_empty() {
            return Err(ConfigError::EmptyStorePath);
        }

        if config.rag.similar_limit == 0 {
            return Err(ConfigError::InvalidSimilarLimit(config.rag.similar_limit));
        }

        if config.generation.strategies.is_empty() {
            return Err(ConfigError::NoStrategies);
        }

        if config.generation.mode == GenerationMode::Text {
            if let Some(strategy) = config
                .generation
                .strategies
                .iter()
                .find(|s| s.references_vision_model())
            {
                return Err(ConfigError::VisionModelInTextMode(strategy.name.clone()));
            }
        }

        for strategy in &config.generation.strategies {
            if strategy.name.trim().is_empty() || strategy.model_id.trim().is_empty() {
                return Err(ConfigError::ValidationFailed(
                    "strategy name and model_id cannot be empty".to_string(),
                ));
            }
        }

        if config.validation.program.trim().is_empty() {
            return Err(ConfigError::EmptyValidationProgram);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::GenerationStrategy;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.validation.max_retries, 2);
        assert_eq!(config.generation.preview_chars, 500);
        assert_eq!(config.generation.strategies.len(), 3);
        assert_eq!(config.rag.similar_limit, 3);
        assert!(config.rag.enabled);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).expect("Default config should be valid");
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r"
logging:
  level: debug
  format: pretty
rag:
  enabled: false
  store_path: /tmp/patterns.json
generation:
  mode: visual
  strategies:
    - name: vision-layout
      model_id: gpt-4-vision-preview
      temperature: 0.5
      max_tokens: 2000
      system_prompt: look at it
      priority: 1
validation:
  program: tsc
  args: ['--noEmit']
  max_retries: 4
";

        let config: Config = serde_yaml::from_str(yaml).expect("YAML should parse");

        assert_eq!(config.logging.level, "debug");
        assert!(!config.rag.enabled);
        assert_eq!(config.rag.store_path, "/tmp/patterns.json");
        assert_eq!(config.generation.mode, GenerationMode::Visual);
        assert_eq!(config.generation.strategies[0].model_id, "gpt-4-vision-preview");
        assert_eq!(config.validation.max_retries, 4);
        assert_eq!(config.retry.max_attempts, 5);

        ConfigLoader::validate(&config).expect("Visual mode allows vision models");
    }

    #[test]
    fn test_vision_model_rejected_in_text_mode() {
        let mut config = Config::default();
        config
            .generation
            .strategies
            .push(GenerationStrategy::new("screenshot", "gpt-4-vision-preview"));

        let result = ConfigLoader::validate(&config);
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::VisionModelInTextMode(name) if name == "screenshot"
        ));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidLogLevel(_)
        ));
    }

    #[test]
    fn test_invalid_backoff() {
        let mut config = Config::default();
        config.retry.initial_backoff_ms = 50_000;
        config.retry.max_backoff_ms = 1_000;
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::InvalidBackoff(50_000, 1_000)
        ));
    }

    #[test]
    fn test_empty_strategies() {
        let mut config = Config::default();
        config.generation.strategies.clear();
        assert!(matches!(
            ConfigLoader::validate(&config).unwrap_err(),
            ConfigError::NoStrategies
        ));
    }

    #[test]
    fn test_env_override() {
        temp_env::with_vars(
            [
                ("PAGEWRIGHT_RAG__ENABLED", Some("false")),
                ("PAGEWRIGHT_VALIDATION__MAX_RETRIES", Some("5")),
            ],
            || {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("config.yaml");
                std::fs::write(&path, "logging:\n  level: warn\n").unwrap();

                let config = ConfigLoader::load_from_file(&path).unwrap();
                assert!(!config.rag.enabled);
                assert_eq!(config.validation.max_retries, 5);
                assert_eq!(config.logging.level, "warn");
            },
        );
    }
}
