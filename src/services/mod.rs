pub mod code_extraction;
pub mod embedding_cache;
pub mod json_repair;
pub mod knowledge_base;
pub mod multi_strategy_generator;
pub mod orchestrator;
pub mod prompt_hints;
pub mod requirements_synthesizer;
pub mod validator;

pub use embedding_cache::{cosine_similarity, EmbeddedText, EmbeddingCache};
pub use knowledge_base::KnowledgeBase;
pub use multi_strategy_generator::MultiStrategyGenerator;
pub use orchestrator::{Agent, AgentOutcome, Orchestrator, TaskContext};
pub use prompt_hints::{extract_hints, PromptHints};
pub use requirements_synthesizer::RequirementsSynthesizer;
pub use validator::Validator;
