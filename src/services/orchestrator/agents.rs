//! Agents the orchestrator routes tasks to.
//!
//! Each agent wraps one service and turns a [`TaskContext`] into a typed
//! [`AgentOutput`]. The context carries the task's own data plus whatever
//! its dependencies produced.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentOutput, AgentResult, ComponentRequirement, GenerationPattern, GenerationResult,
    ParsedRequirements, PatternMatch, TaskKind, ValidationReport,
};
use crate::services::knowledge_base::KnowledgeBase;
use crate::services::multi_strategy_generator::MultiStrategyGenerator;
use crate::services::prompt_hints::extract_hints;
use crate::services::requirements_synthesizer::RequirementsSynthesizer;
use crate::services::validator::Validator;

/// Inputs available to one task.
#[derive(Debug, Clone, Default)]
pub struct TaskContext {
    pub request: String,
    pub data: Map<String, Value>,
    pub requirements: Option<ParsedRequirements>,
    pub generated_code: Option<GenerationResult>,
    pub validation_results: Option<ValidationReport>,
    pub rag_patterns: Option<Vec<PatternMatch>>,
    /// Dependencies that ran and failed, with their failure reasons.
    pub failed_dependencies: Vec<(TaskKind, String)>,
}

impl TaskContext {
    pub fn new(request: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            request: request.into(),
            data,
            ..Default::default()
        }
    }

    /// Take in a dependency's output. Returns false when the payload does
    /// not belong to the agent that produced it.
    pub fn absorb(&mut self, result: &AgentResult) -> bool {
        if result.agent_type.is_none() || result.data.kind() != result.agent_type {
            return false;
        }
        match &result.data {
            AgentOutput::Requirements(parsed) => self.requirements = Some(parsed.clone()),
            AgentOutput::Generation(generated) => self.generated_code = Some(generated.clone()),
            AgentOutput::Validation(report) => self.validation_results = Some(report.clone()),
            AgentOutput::Rag(patterns) => self.rag_patterns = Some(patterns.clone()),
            AgentOutput::Learning { .. } | AgentOutput::Empty => {}
        }
        true
    }

    /// Note a dependency that ran and failed.
    pub fn record_failure(&mut self, result: &AgentResult) {
        if let Some(kind) = result.agent_type {
            self.failed_dependencies.push((kind, result.reasoning.clone()));
        }
    }

    /// Failure reason of the first failed dependency of `kind`.
    pub fn dependency_failure(&self, kind: TaskKind) -> Option<&str> {
        self.failed_dependencies
            .iter()
            .find(|(failed, _)| *failed == kind)
            .map(|(_, reason)| reason.as_str())
    }

    /// Component name from task data (`componentName` or `component_name`).
    pub fn component_name(&self) -> Option<&str> {
        ["componentName", "component_name"]
            .iter()
            .find_map(|key| self.data.get(*key).and_then(Value::as_str))
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }

    /// Code to hand on: the validated version when one exists.
    pub fn latest_code(&self) -> Option<&str> {
        self.validation_results
            .as_ref()
            .map(|report| report.code.as_str())
            .or_else(|| self.generated_code.as_ref().map(|g| g.code.as_str()))
    }
}

/// Successful output of one agent run.
#[derive(Debug, Clone)]
pub struct AgentOutcome {
    pub output: AgentOutput,
    pub confidence: f32,
    pub reasoning: String,
    pub metadata: BTreeMap<String, Value>,
}

impl AgentOutcome {
    pub fn new(output: AgentOutput, confidence: f32, reasoning: impl Into<String>) -> Self {
        Self {
            output,
            confidence,
            reasoning: reasoning.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[async_trait]
pub trait Agent: Send + Sync {
    /// Task kind this agent handles.
    fn kind(&self) -> TaskKind;

    async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome>;
}

pub struct RequirementsAgent {
    synthesizer: Arc<RequirementsSynthesizer>,
}

impl RequirementsAgent {
    pub fn new(synthesizer: Arc<RequirementsSynthesizer>) -> Self {
        Self { synthesizer }
    }
}

#[async_trait]
impl Agent for RequirementsAgent {
    fn kind(&self) -> TaskKind {
        TaskKind::Requirements
    }

    async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome> {
        let parsed = self.synthesizer.parse(&ctx.request, ctx.component_name()).await;
        let confidence = parsed.confidence;
        let reasoning = parsed.reasoning.clone();
        let count = parsed.requirements.len();
        Ok(AgentOutcome::new(AgentOutput::Requirements(parsed), confidence, reasoning)
            .with_metadata("requirementCount", Value::from(count)))
    }
}

pub struct GenerationAgent {
    generator: Arc<MultiStrategyGenerator>,
}

impl GenerationAgent {
    pub fn new(generator: Arc<MultiStrategyGenerator>) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl Agent for GenerationAgent {
    fn kind(&self) -> TaskKind {
        TaskKind::Generation
    }

    async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome> {
        let requirement = match &ctx.requirements {
            Some(parsed) => parsed.primary(),
            None => {
                debug!("No requirements in context, generating from prompt hints");
                extract_hints(&ctx.request).to_requirement()
            }
        };

        let result = self.generator.generate(&requirement, &ctx.request).await?;
        let confidence = result.confidence;
        let reasoning = result.reasoning.clone();
        let strategy = result.strategy.clone();
        Ok(AgentOutcome::new(AgentOutput::Generation(result), confidence, reasoning)
            .with_metadata("strategy", Value::String(strategy)))
    }
}

pub struct ValidationAgent {
    validator: Arc<Validator>,
}

impl ValidationAgent {
    pub fn new(validator: Arc<Validator>) -> Self {
        Self { validator }
    }
}

#[async_trait]
impl Agent for ValidationAgent {
    fn kind(&self) -> TaskKind {
        TaskKind::Validation
    }

    async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome> {
        let code = ctx
            .generated_code
            .as_ref()
            .map(|generated| generated.code.as_str())
            .ok_or_else(|| DomainError::ExecutionFailed("no generated code to validate".to_string()))?;

        let report = self.validator.validate_and_fix_report(code).await?;
        let confidence = (1.0 - 0.1 * report.attempts.saturating_sub(1) as f32).max(0.5);
        let reasoning = if report.repaired {
            format!("compiled after {} attempts", report.attempts)
        } else {
            "compiled on first attempt".to_string()
        };
        Ok(AgentOutcome::new(AgentOutput::Validation(report), confidence, reasoning))
    }
}

/// Records the run as a pattern for future retrieval.
pub struct LearningAgent {
    knowledge_base: Arc<KnowledgeBase>,
}

impl LearningAgent {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Self {
        Self { knowledge_base }
    }
}

#[async_trait]
impl Agent for LearningAgent {
    fn kind(&self) -> TaskKind {
        TaskKind::Learning
    }

    async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome> {
        let code = ctx.latest_code().unwrap_or_default().to_string();
        let failure = [TaskKind::Validation, TaskKind::Generation]
            .into_iter()
            .find_map(|kind| ctx.dependency_failure(kind).map(|reason| format!("{kind} failed: {reason}")));
        let success = failure.is_none() && !code.trim().is_empty();
        let requirements = ctx
            .requirements
            .as_ref()
            .map(|parsed| Value::Array(parsed.requirements.iter().map(ComponentRequirement::to_value).collect()))
            .unwrap_or(Value::Null);

        let mut pattern = GenerationPattern::new(
            component_name_for(ctx),
            ctx.request.clone(),
            requirements,
            code,
            success,
        );
        if let Some(reason) = failure {
            warn!(reason = %reason, "Recording failed generation");
            pattern = pattern.with_feedback(reason);
        } else if !success {
            warn!("Recording unsuccessful generation");
            pattern = pattern.with_feedback("generation produced no code");
        } else if let Some(report) = ctx.validation_results.as_ref().filter(|r| r.repaired) {
            pattern = pattern.with_feedback(format!("needed repair, {} compile attempts", report.attempts));
        }

        let pattern_id = self.knowledge_base.add_pattern(pattern).await?;
        Ok(AgentOutcome::new(
            AgentOutput::Learning { pattern_id },
            1.0,
            if success { "recorded successful pattern" } else { "recorded failed pattern" },
        ))
    }
}

/// Surfaces similar past generations to later tasks.
pub struct RagAgent {
    knowledge_base: Arc<KnowledgeBase>,
    limit: usize,
}

impl RagAgent {
    pub fn new(knowledge_base: Arc<KnowledgeBase>, limit: usize) -> Self {
        Self { knowledge_base, limit }
    }
}

#[async_trait]
impl Agent for RagAgent {
    fn kind(&self) -> TaskKind {
        TaskKind::Rag
    }

    async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome> {
        let entries = self
            .knowledge_base
            .find_similar_patterns(&ctx.request, ctx.component_name(), self.limit)
            .await?;

        let matches: Vec<PatternMatch> = entries
            .into_iter()
            .map(|entry| PatternMatch {
                pattern_id: entry.pattern.id,
                component_name: entry.pattern.component_name,
                user_request: entry.pattern.user_request,
                similarity: entry.similarity,
                success: entry.pattern.success,
            })
            .collect();

        let confidence = matches.first().map_or(0.0, |m| m.similarity.clamp(0.0, 1.0));
        let reasoning = format!("{} similar patterns", matches.len());
        Ok(AgentOutcome::new(AgentOutput::Rag(matches), confidence, reasoning))
    }
}

/// Name for a recorded pattern: task data first, then the layout type.
fn component_name_for(ctx: &TaskContext) -> String {
    if let Some(name) = ctx.component_name() {
        return name.to_string();
    }

    let layout = ctx
        .requirements
        .as_ref()
        .map(|parsed| parsed.primary().layout.layout_type)
        .or_else(|| extract_hints(&ctx.request).layout_type)
        .unwrap_or_default();

    let mut chars = layout.trim().chars();
    match chars.next() {
        Some(first) => format!("{}{}Section", first.to_uppercase(), chars.as_str()),
        None => "Component".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn generated(code: &str) -> GenerationResult {
        GenerationResult {
            code: code.to_string(),
            confidence: 0.8,
            reasoning: "only candidate".to_string(),
            strategy: "structured".to_string(),
            metadata: BTreeMap::new(),
        }
    }

    fn result(kind: TaskKind, data: AgentOutput) -> AgentResult {
        AgentResult {
            task_id: "t".to_string(),
            agent_type: Some(kind),
            success: true,
            data,
            confidence: 1.0,
            reasoning: String::new(),
            metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_absorb_matching_output() {
        let mut ctx = TaskContext::new("hero", Map::new());
        assert!(ctx.absorb(&result(TaskKind::Generation, AgentOutput::Generation(generated("<div/>")))));
        assert_eq!(ctx.latest_code(), Some("<div/>"));

        let report = ValidationReport {
            code: "<section/>".to_string(),
            attempts: 2,
            repaired: true,
        };
        assert!(ctx.absorb(&result(TaskKind::Validation, AgentOutput::Validation(report))));
        assert_eq!(ctx.latest_code(), Some("<section/>"));
    }

    #[test]
    fn test_absorb_rejects_mismatched_output() {
        let mut ctx = TaskContext::new("hero", Map::new());
        assert!(!ctx.absorb(&result(TaskKind::Requirements, AgentOutput::Generation(generated("x")))));
        assert!(ctx.generated_code.is_none());

        let mut neutral = AgentResult::neutral("nothing ran");
        neutral.success = true;
        assert!(!ctx.absorb(&neutral));
    }

    fn knowledge_base() -> Arc<KnowledgeBase> {
        use crate::adapters::completion::ScriptedCompletionService;
        use crate::adapters::storage::InMemoryPatternStore;
        use crate::domain::models::RagConfig;
        use crate::domain::ports::HashEmbeddingProvider;
        use crate::services::embedding_cache::EmbeddingCache;

        let embeddings = Arc::new(EmbeddingCache::with_defaults(Arc::new(HashEmbeddingProvider::default())));
        Arc::new(KnowledgeBase::new(
            Arc::new(InMemoryPatternStore::new()),
            embeddings,
            Arc::new(ScriptedCompletionService::new()),
            RagConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_learning_records_failed_validation() {
        let kb = knowledge_base();
        kb.init().await.unwrap();
        let agent = LearningAgent::new(Arc::clone(&kb));

        let mut ctx = TaskContext::new("a hero", Map::new());
        ctx.absorb(&result(TaskKind::Generation, AgentOutput::Generation(generated("const x = y;"))));
        ctx.record_failure(&AgentResult::failure("validate", TaskKind::Validation, "still broken after 3 attempts"));
        assert_eq!(ctx.dependency_failure(TaskKind::Validation), Some("still broken after 3 attempts"));

        let outcome = agent.run(&ctx).await.unwrap();
        assert_eq!(outcome.reasoning, "recorded failed pattern");

        let stored = kb.patterns().await.unwrap();
        assert!(!stored[0].success);
        assert_eq!(stored[0].generated_code, "const x = y;");
        let feedback = stored[0].feedback.as_deref().unwrap();
        assert!(feedback.contains("validation failed"));
        assert!(feedback.contains("still broken after 3 attempts"));
    }

    #[tokio::test]
    async fn test_learning_records_validated_code_as_success() {
        let kb = knowledge_base();
        kb.init().await.unwrap();
        let agent = LearningAgent::new(Arc::clone(&kb));

        let mut ctx = TaskContext::new("a hero", Map::new());
        ctx.absorb(&result(TaskKind::Generation, AgentOutput::Generation(generated("<div/>"))));
        agent.run(&ctx).await.unwrap();

        let stored = kb.patterns().await.unwrap();
        assert!(stored[0].success);
        assert!(stored[0].feedback.is_none());
    }

    #[test]
    fn test_component_name_sources() {
        let ctx = TaskContext::new("a hero", json!({"componentName": " Banner "}).as_object().cloned().unwrap());
        assert_eq!(ctx.component_name(), Some("Banner"));
        assert_eq!(component_name_for(&ctx), "Banner");

        let ctx = TaskContext::new("a pricing grid with three cards", Map::new());
        assert_eq!(component_name_for(&ctx), "GridSection");

        let ctx = TaskContext::new("make it pop", Map::new());
        assert_eq!(component_name_for(&ctx), "Component");
    }
}
