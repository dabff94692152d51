//! Plan construction: model-produced task graphs and the fixed fallback.
//!
//! The planner's reply is untrusted. Structural problems (missing arrays,
//! tasks without ids or with unknown types, an execution order that names no
//! task) reject the whole plan. Soft problems are coerced: a bad priority
//! becomes the task's index, a bad estimate becomes 30 seconds and a bad
//! confidence becomes 0.5.

use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

use crate::domain::models::{OrchestrationPlan, OrchestrationTask, TaskKind};
use crate::services::json_repair;

pub const DEFAULT_ESTIMATED_TIME: f64 = 30.0;
pub const DEFAULT_PLAN_CONFIDENCE: f32 = 0.5;

pub const REQUIREMENTS_TASK_ID: &str = "requirements_analysis";
pub const GENERATION_TASK_ID: &str = "component_generation";
pub const VALIDATION_TASK_ID: &str = "component_validation";
pub const LEARNING_TASK_ID: &str = "pattern_learning";

pub(super) const PLANNER_SYSTEM_PROMPT: &str = "You are a task planner for a UI generation \
pipeline. Break the request into tasks for the available agents and order them so every task \
runs after its dependencies. Respond with a single JSON object only.";

/// Why a planner reply was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("planner reply held no JSON object")]
    NoJson,

    #[error("'{0}' is missing or not an array")]
    NotAnArray(&'static str),

    #[error("task {index} is invalid: {reason}")]
    InvalidTask { index: usize, reason: String },

    #[error("execution order is empty")]
    EmptyExecutionOrder,

    #[error("execution order references no known task")]
    NoResolvableTasks,
}

/// The fixed plan used whenever the planner cannot be trusted.
pub fn fallback_plan(include_validation: bool) -> OrchestrationPlan {
    let mut tasks = vec![
        OrchestrationTask::new(REQUIREMENTS_TASK_ID, TaskKind::Requirements, 1),
        OrchestrationTask::new(GENERATION_TASK_ID, TaskKind::Generation, 2)
            .depends_on(&[REQUIREMENTS_TASK_ID]),
    ];
    let mut learning_deps = vec![REQUIREMENTS_TASK_ID, GENERATION_TASK_ID];

    if include_validation {
        tasks.push(
            OrchestrationTask::new(VALIDATION_TASK_ID, TaskKind::Validation, 3)
                .depends_on(&[GENERATION_TASK_ID]),
        );
        learning_deps.push(VALIDATION_TASK_ID);
    }

    let learning_priority = tasks.len() as i32 + 1;
    tasks.push(
        OrchestrationTask::new(LEARNING_TASK_ID, TaskKind::Learning, learning_priority)
            .depends_on(&learning_deps),
    );

    let execution_order = tasks.iter().map(|t| t.id.clone()).collect();
    OrchestrationPlan {
        estimated_time: 15.0 * tasks.len() as f64,
        tasks,
        execution_order,
        confidence: 0.6,
        is_fallback: true,
    }
}

/// Instructions sent to the planner along with the request.
pub(super) fn planner_prompt(request: &str, available: &[TaskKind]) -> String {
    let kinds = available
        .iter()
        .map(TaskKind::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Request: {request}\n\n\
         Available agent types: {kinds}\n\n\
         Return {{\"tasks\": [{{\"id\": \"...\", \"type\": \"<agent type>\", \"priority\": 1, \
         \"data\": {{}}, \"dependencies\": [\"<task id>\"]}}], \"executionOrder\": [\"<task id>\"], \
         \"estimatedTime\": <seconds>, \"confidence\": 0.0-1.0}}"
    )
}

/// Parse a planner reply into a plan.
pub fn parse_plan(response: &str) -> Result<OrchestrationPlan, PlanError> {
    let (map, _) = json_repair::parse_json_object(response).ok_or(PlanError::NoJson)?;

    let raw_tasks = map
        .get("tasks")
        .and_then(Value::as_array)
        .ok_or(PlanError::NotAnArray("tasks"))?;
    let raw_order = map
        .get("executionOrder")
        .and_then(Value::as_array)
        .ok_or(PlanError::NotAnArray("executionOrder"))?;

    let mut tasks = Vec::with_capacity(raw_tasks.len());
    let mut seen = HashSet::new();
    for (index, raw) in raw_tasks.iter().enumerate() {
        let task = parse_task(index, raw)?;
        if !seen.insert(task.id.clone()) {
            return Err(PlanError::InvalidTask {
                index,
                reason: format!("duplicate id '{}'", task.id),
            });
        }
        tasks.push(task);
    }

    let execution_order: Vec<String> = raw_order.iter().filter_map(id_of).collect();
    if execution_order.is_empty() {
        return Err(PlanError::EmptyExecutionOrder);
    }
    if !execution_order.iter().any(|id| seen.contains(id)) {
        return Err(PlanError::NoResolvableTasks);
    }

    let estimated_time = map
        .get("estimatedTime")
        .and_then(number_of)
        .filter(|t| t.is_finite() && *t >= 0.0)
        .unwrap_or(DEFAULT_ESTIMATED_TIME);
    let confidence = map
        .get("confidence")
        .and_then(number_of)
        .filter(|c| c.is_finite())
        .map_or(DEFAULT_PLAN_CONFIDENCE, |c| c.clamp(0.0, 1.0) as f32);

    Ok(OrchestrationPlan {
        tasks,
        execution_order,
        estimated_time,
        confidence,
        is_fallback: false,
    })
}

fn parse_task(index: usize, raw: &Value) -> Result<OrchestrationTask, PlanError> {
    let invalid = |reason: &str| PlanError::InvalidTask {
        index,
        reason: reason.to_string(),
    };

    let obj = raw.as_object().ok_or_else(|| invalid("not an object"))?;
    let id = obj.get("id").and_then(id_of).ok_or_else(|| invalid("missing id"))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| invalid("missing type"))?
        .parse::<TaskKind>()
        .map_err(|e| invalid(&e))?;

    let priority = obj
        .get("priority")
        .and_then(number_of)
        .filter(|p| p.is_finite())
        .map_or(index as i32, |p| p.round() as i32);
    let data = obj
        .get("data")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_else(Map::new);
    let dependencies = obj
        .get("dependencies")
        .and_then(Value::as_array)
        .map(|deps| deps.iter().filter_map(id_of).collect())
        .unwrap_or_default();

    Ok(OrchestrationTask {
        id,
        kind,
        priority,
        data,
        dependencies,
    })
}

/// Ids may arrive as strings or bare numbers.
fn id_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn number_of(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
