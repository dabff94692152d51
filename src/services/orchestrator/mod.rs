//! Request orchestration.
//!
//! A request becomes a plan (from the planner model, or the fixed fallback),
//! and the plan's tasks run one at a time in execution order. Each task sees
//! its own data plus the outputs of its successful dependencies. A failing
//! task produces a failed result and the plan keeps going.

pub mod agents;
pub mod plan;

pub use agents::{
    Agent, AgentOutcome, GenerationAgent, LearningAgent, RagAgent, RequirementsAgent, TaskContext,
    ValidationAgent,
};
pub use plan::{fallback_plan, parse_plan, PlanError};

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{
    AgentOutput, AgentResult, OrchestrationPlan, OrchestratorConfig, TaskKind,
};
use crate::domain::ports::{CompletionRequest, CompletionService};

pub struct Orchestrator {
    completion: Arc<dyn CompletionService>,
    agents: HashMap<TaskKind, Arc<dyn Agent>>,
    config: OrchestratorConfig,
    validation_in_fallback: bool,
}

impl Orchestrator {
    pub fn new(completion: Arc<dyn CompletionService>, config: OrchestratorConfig) -> Self {
        Self {
            completion,
            agents: HashMap::new(),
            config,
            validation_in_fallback: false,
        }
    }

    /// Register an agent, replacing any previous agent of the same kind.
    pub fn with_agent(mut self, agent: Arc<dyn Agent>) -> Self {
        self.register(agent);
        self
    }

    pub fn register(&mut self, agent: Arc<dyn Agent>) {
        if self.agents.insert(agent.kind(), agent).is_some() {
            debug!("Replaced previously registered agent");
        }
    }

    /// Insert a validation stage into the fallback plan.
    pub fn with_validation_in_fallback(mut self, enabled: bool) -> Self {
        self.validation_in_fallback = enabled;
        self
    }

    /// Registered agent kinds, sorted.
    pub fn agent_kinds(&self) -> Vec<TaskKind> {
        let mut kinds: Vec<TaskKind> = self.agents.keys().copied().collect();
        kinds.sort();
        kinds
    }

    /// Build a plan for `request`. Never fails; any planner problem yields
    /// the fallback plan.
    #[instrument(skip(self, request))]
    pub async fn plan(&self, request: &str) -> OrchestrationPlan {
        if !self.config.use_planner {
            debug!("Planner disabled, using fallback plan");
            return fallback_plan(self.validation_in_fallback);
        }

        let completion_request = CompletionRequest::new(
            self.config.planner_model.clone(),
            plan::PLANNER_SYSTEM_PROMPT,
            plan::planner_prompt(request, &self.agent_kinds()),
        )
        .with_temperature(0.1)
        .with_max_tokens(2048);

        let response = match self.completion.complete(completion_request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Planner call failed, using fallback plan");
                return fallback_plan(self.validation_in_fallback);
            }
        };

        match parse_plan(&response) {
            Ok(plan) => {
                info!(
                    tasks = plan.tasks.len(),
                    confidence = plan.confidence,
                    "Planner produced a plan"
                );
                plan
            }
            Err(e) => {
                warn!(error = %e, "Planner reply rejected, using fallback plan");
                fallback_plan(self.validation_in_fallback)
            }
        }
    }

    /// Run `plan` sequentially. Always returns at least one result.
    #[instrument(skip(self, plan, request), fields(tasks = plan.tasks.len(), fallback = plan.is_fallback))]
    pub async fn execute(&self, plan: &OrchestrationPlan, request: &str) -> Vec<AgentResult> {
        let mut results: Vec<AgentResult> = Vec::new();
        let mut by_id: HashMap<&str, usize> = HashMap::new();
        let mut executed: HashSet<&str> = HashSet::new();

        for task_id in &plan.execution_order {
            let Some(task) = plan.task(task_id) else {
                warn!(task_id = %task_id, "Execution order names an unknown task, skipping");
                continue;
            };
            if !executed.insert(task_id.as_str()) {
                warn!(task_id = %task_id, "Task listed twice in execution order, skipping repeat");
                continue;
            }
            let Some(agent) = self.agents.get(&task.kind) else {
                warn!(task_id = %task_id, kind = %task.kind, "No agent registered for task kind, skipping");
                continue;
            };

            let mut ctx = TaskContext::new(request, task.data.clone());
            for dep in &task.dependencies {
                match by_id.get(dep.as_str()).map(|&i| &results[i]) {
                    Some(dep_result) if dep_result.success => {
                        if !ctx.absorb(dep_result) {
                            warn!(task_id = %task_id, dependency = %dep, "Dependency output does not match its agent, ignoring");
                        }
                    }
                    Some(dep_result) => {
                        debug!(task_id = %task_id, dependency = %dep, "Dependency failed");
                        ctx.record_failure(dep_result);
                    }
                    None => debug!(task_id = %task_id, dependency = %dep, "Dependency did not run"),
                }
            }

            let started = Instant::now();
            let outcome = agent.run(&ctx).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let mut result = match outcome {
                Ok(outcome) if outcome.output.kind() == Some(task.kind) => {
                    info!(task_id = %task_id, kind = %task.kind, elapsed_ms, "Task completed");
                    AgentResult {
                        task_id: task_id.clone(),
                        agent_type: Some(task.kind),
                        success: true,
                        data: outcome.output,
                        confidence: outcome.confidence.clamp(0.0, 1.0),
                        reasoning: outcome.reasoning,
                        metadata: outcome.metadata,
                    }
                }
                Ok(outcome) => {
                    warn!(task_id = %task_id, kind = %task.kind, "Agent returned output of the wrong kind");
                    AgentResult::failure(
                        task_id.clone(),
                        task.kind,
                        format!(
                            "agent returned {} output for a {} task",
                            outcome.output.kind().map_or("empty", |k| k.as_str()),
                            task.kind
                        ),
                    )
                }
                Err(e) => {
                    warn!(task_id = %task_id, kind = %task.kind, error = %e, "Task failed");
                    AgentResult::failure(task_id.clone(), task.kind, e.to_string())
                }
            };
            result
                .metadata
                .insert("elapsedMs".to_string(), Value::from(elapsed_ms));

            by_id.insert(task_id.as_str(), results.len());
            results.push(result);
        }

        if results.is_empty() {
            warn!("Plan produced no results");
            results.push(AgentResult::neutral("No tasks were executed for this request"));
        }

        results
    }

    /// Plan and execute `request`.
    #[instrument(skip(self, request), fields(chars = request.len()))]
    pub async fn orchestrate(&self, request: &str) -> Vec<AgentResult> {
        let plan = self.plan(request).await;
        self.execute(&plan, request).await
    }
}

/// The code a run ended with: the last validated artifact, else the last
/// generated one.
pub fn final_code(results: &[AgentResult]) -> Option<&str> {
    let successful = || results.iter().rev().filter(|r| r.success);
    successful()
        .find_map(|r| match &r.data {
            AgentOutput::Validation(report) => Some(report.code.as_str()),
            _ => None,
        })
        .or_else(|| {
            successful().find_map(|r| match &r.data {
                AgentOutput::Generation(generated) => Some(generated.code.as_str()),
                _ => None,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::completion::{ScriptedCompletionService, ScriptedReply};
    use crate::domain::errors::{DomainError, DomainResult};
    use crate::domain::models::{GenerationResult, ParsedRequirements, ValidationReport};
    use std::collections::BTreeMap;
    use crate::domain::ports::CompletionError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Records the context it saw; optionally fails or lies about its output.
    struct StubAgent {
        kind: TaskKind,
        fail: bool,
        output: Option<AgentOutput>,
        seen: Mutex<Vec<TaskContext>>,
    }

    impl StubAgent {
        fn new(kind: TaskKind) -> Self {
            Self {
                kind,
                fail: false,
                output: None,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing(mut self) -> Self {
            self.fail = true;
            self
        }

        fn returning(mut self, output: AgentOutput) -> Self {
            self.output = Some(output);
            self
        }
    }

    #[async_trait]
    impl Agent for StubAgent {
        fn kind(&self) -> TaskKind {
            self.kind
        }

        async fn run(&self, ctx: &TaskContext) -> DomainResult<AgentOutcome> {
            self.seen.lock().unwrap().push(ctx.clone());
            if self.fail {
                return Err(DomainError::ExecutionFailed("stub failure".to_string()));
            }
            let output = self.output.clone().unwrap_or_else(|| match self.kind {
                TaskKind::Requirements => AgentOutput::Requirements(ParsedRequirements {
                    requirements: vec![Default::default()],
                    confidence: 0.9,
                    reasoning: "stub".to_string(),
                }),
                TaskKind::Rag => AgentOutput::Rag(Vec::new()),
                TaskKind::Learning => AgentOutput::Learning {
                    pattern_id: uuid::Uuid::nil(),
                },
                _ => AgentOutput::Empty,
            });
            Ok(AgentOutcome::new(output, 0.9, "stub"))
        }
    }

    fn planner(reply: ScriptedReply) -> Arc<ScriptedCompletionService> {
        Arc::new(ScriptedCompletionService::new().on("task planner", reply))
    }

    #[tokio::test]
    async fn test_missing_execution_order_falls_back() {
        let completion = planner(ScriptedReply::text(
            r#"{"tasks": [{"id": "a", "type": "requirements"}]}"#,
        ));
        let orchestrator = Orchestrator::new(completion.clone(), OrchestratorConfig::default());

        let plan = orchestrator.plan("a hero").await;
        assert!(plan.is_fallback);
        assert_eq!(
            plan.execution_order,
            vec![plan::REQUIREMENTS_TASK_ID, plan::GENERATION_TASK_ID, plan::LEARNING_TASK_ID]
        );
        assert_eq!(completion.calls_matching("task planner"), 1);
    }

    #[tokio::test]
    async fn test_planner_error_falls_back() {
        let orchestrator = Orchestrator::new(
            planner(ScriptedReply::fail(CompletionError::Timeout)),
            OrchestratorConfig::default(),
        )
        .with_validation_in_fallback(true);

        let plan = orchestrator.plan("a hero").await;
        assert!(plan.is_fallback);
        assert!(plan.task(plan::VALIDATION_TASK_ID).is_some());
    }

    #[tokio::test]
    async fn test_planner_disabled_skips_call() {
        let completion = planner(ScriptedReply::text("{}"));
        let config = OrchestratorConfig {
            use_planner: false,
            ..Default::default()
        };
        let plan = Orchestrator::new(completion.clone(), config).plan("x").await;
        assert!(plan.is_fallback);
        assert_eq!(completion.call_count(), 0);
    }

    #[tokio::test]
    async fn test_dependency_outputs_reach_context() {
        let requirements = Arc::new(StubAgent::new(TaskKind::Requirements));
        let rag = Arc::new(StubAgent::new(TaskKind::Rag));
        let learning = Arc::new(StubAgent::new(TaskKind::Learning));
        let orchestrator = Orchestrator::new(
            planner(ScriptedReply::text(
                r#"{"tasks": [
                    {"id": "r", "type": "requirements"},
                    {"id": "k", "type": "rag"},
                    {"id": "l", "type": "learning", "dependencies": ["r", "k"], "data": {"componentName": "Hero"}}
                ], "executionOrder": ["r", "k", "ghost", "l"]}"#,
            )),
            OrchestratorConfig::default(),
        )
        .with_agent(requirements.clone())
        .with_agent(rag.clone())
        .with_agent(learning.clone());

        let results = orchestrator.orchestrate("a hero").await;
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| r.success));
        assert!(results.iter().all(|r| r.metadata.contains_key("elapsedMs")));

        let seen = learning.seen.lock().unwrap();
        assert!(seen[0].requirements.is_some());
        assert_eq!(seen[0].rag_patterns.as_deref(), Some(&[][..]));
        assert_eq!(seen[0].component_name(), Some("Hero"));
        assert!(requirements.seen.lock().unwrap()[0].requirements.is_none());
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_plan() {
        let learning = Arc::new(StubAgent::new(TaskKind::Learning));
        let config = OrchestratorConfig {
            use_planner: false,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(ScriptedCompletionService::new()), config)
            .with_agent(Arc::new(StubAgent::new(TaskKind::Requirements)))
            .with_agent(Arc::new(StubAgent::new(TaskKind::Generation).failing()))
            .with_agent(learning.clone());

        let results = orchestrator.orchestrate("a hero").await;
        assert_eq!(results.len(), 3);
        assert!(results[0].success);
        assert!(!results[1].success);
        assert_eq!(results[1].confidence, 0.0);
        assert_eq!(results[1].data, AgentOutput::Empty);
        assert!(results[1].reasoning.contains("stub failure"));
        assert!(results[2].success);

        let seen = learning.seen.lock().unwrap();
        assert!(seen[0].requirements.is_some());
        assert!(seen[0].generated_code.is_none());
        let reason = seen[0].dependency_failure(TaskKind::Generation).unwrap();
        assert!(reason.contains("stub failure"));
        assert!(seen[0].dependency_failure(TaskKind::Requirements).is_none());
    }

    #[tokio::test]
    async fn test_wrong_output_kind_is_failure() {
        let config = OrchestratorConfig {
            use_planner: false,
            ..Default::default()
        };
        let orchestrator = Orchestrator::new(Arc::new(ScriptedCompletionService::new()), config)
            .with_agent(Arc::new(
                StubAgent::new(TaskKind::Requirements).returning(AgentOutput::Rag(Vec::new())),
            ));

        let results = orchestrator.orchestrate("a hero").await;
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert!(results[0].reasoning.contains("rag output for a requirements task"));
    }

    #[tokio::test]
    async fn test_no_results_yields_neutral() {
        let orchestrator =
            Orchestrator::new(Arc::new(ScriptedCompletionService::new()), OrchestratorConfig::default());

        let results = orchestrator.orchestrate("a hero").await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].agent_type, None);
        assert!(!results[0].success);
        assert_eq!(results[0].confidence, 0.0);
    }

    #[test]
    fn test_final_code_prefers_validated() {
        let generated = AgentResult {
            task_id: "g".to_string(),
            agent_type: Some(TaskKind::Generation),
            success: true,
            data: AgentOutput::Generation(GenerationResult {
                code: "raw".to_string(),
                confidence: 0.8,
                reasoning: String::new(),
                strategy: "structured".to_string(),
                metadata: BTreeMap::new(),
            }),
            confidence: 0.8,
            reasoning: String::new(),
            metadata: BTreeMap::new(),
        };
        assert_eq!(final_code(std::slice::from_ref(&generated)), Some("raw"));

        let mut validated = generated.clone();
        validated.agent_type = Some(TaskKind::Validation);
        validated.data = AgentOutput::Validation(ValidationReport {
            code: "fixed".to_string(),
            attempts: 2,
            repaired: true,
        });
        assert_eq!(final_code(&[generated.clone(), validated]), Some("fixed"));

        assert_eq!(final_code(&[AgentResult::neutral("nothing")]), None);
    }
}
