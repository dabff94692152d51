pub mod config;
pub mod generation;
pub mod orchestration;
pub mod pattern;
pub mod requirement;
pub mod validation;

pub use config::{
    CompletionBackend, CompletionConfig, Config, EmbeddingBackend, EmbeddingConfig,
    GenerationConfig, LogFormat, LoggingConfig, OrchestratorConfig, RagConfig, RetryConfig,
    RotationPolicy, ValidationConfig,
};
pub use generation::{
    CandidateOutcome, GenerationMode, GenerationRecord, GenerationResult, GenerationStrategy,
};
pub use orchestration::{
    AgentOutput, AgentResult, OrchestrationPlan, OrchestrationTask, PatternMatch, TaskKind,
};
pub use pattern::{GenerationPattern, KnowledgeBaseEntry, KnowledgeBaseStats};
pub use requirement::{
    ComponentRequirement, ContentSpec, InteractionSpec, LayoutSpec, ParsedRequirements,
    StylingSpec,
};
pub use validation::{CompileOutput, ValidationReport, ValidationResult};
