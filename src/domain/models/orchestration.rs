//! Orchestration plan, task and agent result models.
//!
//! Data flowing between agents is a tagged union ([`AgentOutput`]) rather
//! than free-form JSON, so each boundary crossing is checked by the type
//! system and by [`AgentOutput::kind`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::generation::GenerationResult;
use super::requirement::ParsedRequirements;
use super::validation::ValidationReport;

/// The kind of agent a task is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    Requirements,
    Generation,
    Validation,
    Learning,
    Rag,
}

impl TaskKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TaskKind::Requirements => "requirements",
            TaskKind::Generation => "generation",
            TaskKind::Validation => "validation",
            TaskKind::Learning => "learning",
            TaskKind::Rag => "rag",
        }
    }

    /// Key under which this kind's output is exposed to dependent tasks.
    pub const fn context_key(&self) -> &'static str {
        match self {
            TaskKind::Requirements => "requirements",
            TaskKind::Generation => "generatedCode",
            TaskKind::Validation => "validationResults",
            TaskKind::Rag => "ragPatterns",
            TaskKind::Learning => "learning",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "requirements" => Ok(TaskKind::Requirements),
            "generation" => Ok(TaskKind::Generation),
            "validation" => Ok(TaskKind::Validation),
            "learning" => Ok(TaskKind::Learning),
            "rag" => Ok(TaskKind::Rag),
            other => Err(format!("unknown task type: {other}")),
        }
    }
}

/// One node of a plan. Never mutated after plan construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationTask {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TaskKind,
    pub priority: i32,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl OrchestrationTask {
    pub fn new(id: impl Into<String>, kind: TaskKind, priority: i32) -> Self {
        Self {
            id: id.into(),
            kind,
            priority,
            data: Map::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn depends_on(mut self, ids: &[&str]) -> Self {
        self.dependencies = ids.iter().map(|id| (*id).to_string()).collect();
        self
    }
}

/// A dependency-ordered set of tasks for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationPlan {
    pub tasks: Vec<OrchestrationTask>,
    pub execution_order: Vec<String>,
    /// Estimated wall-clock seconds.
    pub estimated_time: f64,
    pub confidence: f32,
    /// True when the fixed fallback plan was substituted.
    #[serde(default)]
    pub is_fallback: bool,
}

impl OrchestrationPlan {
    pub fn task(&self, id: &str) -> Option<&OrchestrationTask> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Ids in `execution_order` with no matching task.
    pub fn dangling_ids(&self) -> Vec<&str> {
        self.execution_order
            .iter()
            .filter(|id| self.task(id).is_none())
            .map(String::as_str)
            .collect()
    }
}

/// Summary of a retrieved pattern passed to dependent tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub pattern_id: Uuid,
    pub component_name: String,
    pub user_request: String,
    pub similarity: f32,
    pub success: bool,
}

/// Typed payload produced by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum AgentOutput {
    Requirements(ParsedRequirements),
    Generation(GenerationResult),
    Validation(ValidationReport),
    Learning { pattern_id: Uuid },
    Rag(Vec<PatternMatch>),
    /// No payload (failed or neutral results).
    Empty,
}

impl AgentOutput {
    /// The task kind this payload belongs to, if any.
    pub fn kind(&self) -> Option<TaskKind> {
        match self {
            AgentOutput::Requirements(_) => Some(TaskKind::Requirements),
            AgentOutput::Generation(_) => Some(TaskKind::Generation),
            AgentOutput::Validation(_) => Some(TaskKind::Validation),
            AgentOutput::Learning { .. } => Some(TaskKind::Learning),
            AgentOutput::Rag(_) => Some(TaskKind::Rag),
            AgentOutput::Empty => None,
        }
    }
}

/// The result of executing one task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentResult {
    pub task_id: String,
    /// Kind of agent that produced this result; `None` for synthesized results.
    pub agent_type: Option<TaskKind>,
    pub success: bool,
    pub data: AgentOutput,
    pub confidence: f32,
    pub reasoning: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

impl AgentResult {
    /// A failed task: no data, zero confidence.
    pub fn failure(task_id: impl Into<String>, kind: TaskKind, reason: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            agent_type: Some(kind),
            success: false,
            data: AgentOutput::Empty,
            confidence: 0.0,
            reasoning: reason.into(),
            metadata: BTreeMap::new(),
        }
    }

    /// The neutral result returned when a plan produced nothing.
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            task_id: "orchestration-fallback".to_string(),
            agent_type: None,
            success: false,
            data: AgentOutput::Empty,
            confidence: 0.0,
            reasoning: reason.into(),
            metadata: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_kind_parse() {
        assert_eq!("Generation".parse::<TaskKind>().unwrap(), TaskKind::Generation);
        assert_eq!(" rag ".parse::<TaskKind>().unwrap(), TaskKind::Rag);
        assert!("deploy".parse::<TaskKind>().is_err());
    }

    #[test]
    fn test_context_keys() {
        assert_eq!(TaskKind::Requirements.context_key(), "requirements");
        assert_eq!(TaskKind::Generation.context_key(), "generatedCode");
        assert_eq!(TaskKind::Validation.context_key(), "validationResults");
        assert_eq!(TaskKind::Rag.context_key(), "ragPatterns");
    }

    #[test]
    fn test_dangling_ids() {
        let plan = OrchestrationPlan {
            tasks: vec![OrchestrationTask::new("a", TaskKind::Requirements, 1)],
            execution_order: vec!["a".to_string(), "ghost".to_string()],
            estimated_time: 10.0,
            confidence: 0.5,
            is_fallback: false,
        };
        assert_eq!(plan.dangling_ids(), vec!["ghost"]);
        assert!(plan.task("a").is_some());
    }

    #[test]
    fn test_agent_output_kind() {
        assert_eq!(AgentOutput::Rag(vec![]).kind(), Some(TaskKind::Rag));
        assert_eq!(AgentOutput::Empty.kind(), None);
        let value = serde_json::to_value(AgentOutput::Rag(vec![])).unwrap();
        assert_eq!(value["kind"], "rag");
    }
}
