use serde::{Deserialize, Serialize};

use super::generation::{GenerationMode, GenerationStrategy};

/// Main configuration structure for Pagewright
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Completion service configuration
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Embedding backend configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retry policy for rate-limited embedding calls
    #[serde(default)]
    pub retry: RetryConfig,

    /// Retrieval / knowledge base configuration
    #[serde(default)]
    pub rag: RagConfig,

    /// Multi-strategy generation configuration
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Compile-and-repair configuration
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Planner configuration
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files (stderr only when unset)
    #[serde(default)]
    pub log_dir: Option<String>,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

/// Which completion backend to construct
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CompletionBackend {
    #[default]
    Anthropic,
    /// Offline backend returning canned responses
    Scripted,
}

/// Completion service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CompletionConfig {
    #[serde(default)]
    pub backend: CompletionBackend,

    /// API key. Falls back to `ANTHROPIC_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// Model used for parsing, RAG synthesis and repairs
    #[serde(default = "default_completion_model")]
    pub model: String,

    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,

    /// Client-side throttle
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
}

fn default_completion_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_completion_model() -> String {
    "claude-3-5-sonnet-20241022".to_string()
}

const fn default_completion_timeout_secs() -> u64 {
    120
}

const fn default_requests_per_second() -> u32 {
    10
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            backend: CompletionBackend::default(),
            api_key: None,
            base_url: default_completion_base_url(),
            model: default_completion_model(),
            timeout_secs: default_completion_timeout_secs(),
            requests_per_second: default_requests_per_second(),
        }
    }
}

/// Which embedding backend to construct
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    #[default]
    Openai,
    /// Deterministic hash vectors, no network
    Hash,
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// API key. Falls back to `OPENAI_API_KEY` env var.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Per-request timeout, applied on top of retry/backoff
    #[serde(default = "default_embedding_timeout_secs")]
    pub timeout_secs: u64,

    /// Dimension of degraded-mode hash vectors
    #[serde(default = "default_fallback_dimension")]
    pub fallback_dimension: usize,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

const fn default_embedding_dimension() -> usize {
    1536
}

const fn default_embedding_timeout_secs() -> u64 {
    30
}

const fn default_fallback_dimension() -> usize {
    64
}

const fn default_cache_capacity() -> u64 {
    10_000
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            api_key: None,
            base_url: default_embedding_base_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout_secs(),
            fallback_dimension: default_fallback_dimension(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts including the first call
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial backoff delay in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Maximum backoff delay in milliseconds (before jitter)
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Upper bound of random jitter added to each delay
    #[serde(default = "default_max_jitter_ms")]
    pub max_jitter_ms: u64,
}

const fn default_max_attempts() -> u32 {
    5
}

const fn default_initial_backoff_ms() -> u64 {
    1000
}

const fn default_max_backoff_ms() -> u64 {
    30_000
}

const fn default_max_jitter_ms() -> u64 {
    1000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            max_jitter_ms: default_max_jitter_ms(),
        }
    }
}

/// Retrieval-augmented knowledge base configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RagConfig {
    /// Retrieval switch. Pattern writes continue when disabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Patterns retrieved for requirement synthesis
    #[serde(default = "default_similar_limit")]
    pub similar_limit: usize,

    /// JSON file holding the pattern collection
    #[serde(default = "default_store_path")]
    pub store_path: String,
}

const fn default_true() -> bool {
    true
}

const fn default_similar_limit() -> usize {
    3
}

fn default_store_path() -> String {
    ".pagewright/patterns.json".to_string()
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            similar_limit: default_similar_limit(),
            store_path: default_store_path(),
        }
    }
}

/// Multi-strategy generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationConfig {
    #[serde(default)]
    pub mode: GenerationMode,

    #[serde(default = "default_judge_model")]
    pub judge_model: String,

    /// Characters of each candidate shown to the judge
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,

    #[serde(default = "default_strategies")]
    pub strategies: Vec<GenerationStrategy>,
}

fn default_judge_model() -> String {
    default_completion_model()
}

const fn default_preview_chars() -> usize {
    500
}

/// Built-in strategy set: three text-only attempts with different temperaments.
pub fn default_strategies() -> Vec<GenerationStrategy> {
    vec![
        GenerationStrategy::new("structured", "claude-3-5-sonnet-20241022")
            .with_temperature(0.2)
            .with_priority(1)
            .with_system_prompt(
                "You write clean, semantic, accessible markup components. \
                 Follow the requirements exactly and prefer simple structure.",
            ),
        GenerationStrategy::new("creative", "claude-3-5-sonnet-20241022")
            .with_temperature(0.8)
            .with_priority(2)
            .with_system_prompt(
                "You write expressive markup components with thoughtful layout and \
                 motion, while still honoring every requirement.",
            ),
        GenerationStrategy::new("minimal", "claude-3-5-haiku-20241022")
            .with_temperature(0.4)
            .with_priority(3)
            .with_system_prompt(
                "You write the smallest correct markup component that satisfies the \
                 requirements. No extra sections.",
            ),
    ]
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            mode: GenerationMode::default(),
            judge_model: default_judge_model(),
            preview_chars: default_preview_chars(),
            strategies: default_strategies(),
        }
    }
}

/// Compile-and-repair configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidationConfig {
    /// Insert a validation stage into the fallback plan
    #[serde(default)]
    pub in_fallback_plan: bool,

    /// Toolchain executable
    #[serde(default = "default_validation_program")]
    pub program: String,

    /// Arguments; `{file}` is replaced by the artifact path, else it is appended
    #[serde(default = "default_validation_args")]
    pub args: Vec<String>,

    /// Extension of the temporary artifact
    #[serde(default = "default_file_extension")]
    pub file_extension: String,

    /// Repair attempts after the first compile
    #[serde(default = "default_validation_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_validation_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_validation_program() -> String {
    "npx".to_string()
}

fn default_validation_args() -> Vec<String> {
    ["--yes", "tsc", "--noEmit", "--jsx", "preserve", "{file}"]
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_file_extension() -> String {
    "tsx".to_string()
}

const fn default_validation_max_retries() -> u32 {
    2
}

const fn default_validation_timeout_secs() -> u64 {
    60
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            in_fallback_plan: false,
            program: default_validation_program(),
            args: default_validation_args(),
            file_extension: default_file_extension(),
            max_retries: default_validation_max_retries(),
            timeout_secs: default_validation_timeout_secs(),
        }
    }
}

/// Planner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct OrchestratorConfig {
    /// Ask the model for a plan; when false the fallback plan is always used
    #[serde(default = "default_true")]
    pub use_planner: bool,

    #[serde(default = "default_completion_model")]
    pub planner_model: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            use_planner: true,
            planner_model: default_completion_model(),
        }
    }
}
