//! Generation strategy and result models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::requirement::ComponentRequirement;

/// Identifier fragments that mark a model as vision-capable.
pub const VISION_MODEL_MARKERS: &[&str] = &["vision", "-vl", "gpt-4v", "llava", "pixtral"];

/// Whether generation may use image-aware models.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Text,
    Visual,
}

/// One configured generation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GenerationStrategy {
    pub name: String,
    pub model_id: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub system_prompt: String,
    /// Lower runs first in listings; ties keep configuration order.
    pub priority: u32,
}

impl GenerationStrategy {
    pub fn new(name: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_id: model_id.into(),
            temperature: 0.4,
            max_tokens: 4096,
            system_prompt: String::new(),
            priority: 1,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    /// True when the strategy's name or model id references a vision model.
    pub fn references_vision_model(&self) -> bool {
        let name = self.name.to_lowercase();
        let model = self.model_id.to_lowercase();
        VISION_MODEL_MARKERS
            .iter()
            .any(|marker| name.contains(marker) || model.contains(marker))
    }
}

/// The winning (or only) candidate of a generation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResult {
    pub code: String,
    pub confidence: f32,
    pub reasoning: String,
    /// Name of the strategy that produced the code.
    pub strategy: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, Value>,
}

/// Outcome of one strategy inside a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CandidateOutcome {
    Succeeded(GenerationResult),
    Failed { strategy: String, error: String },
}

impl CandidateOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CandidateOutcome::Succeeded(_))
    }
}

/// One entry of the in-memory generation log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRecord {
    pub id: Uuid,
    pub original_request: String,
    pub requirements: ComponentRequirement,
    pub candidates: Vec<CandidateOutcome>,
    pub selected: Option<GenerationResult>,
    pub judged: bool,
    pub timestamp: DateTime<Utc>,
}
