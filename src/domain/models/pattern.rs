//! Generation pattern domain model.
//!
//! A pattern is one completed generation: the request, the requirements it
//! was parsed into, the code produced and whether it worked. Patterns are
//! append-only and feed retrieval-augmented requirement synthesis.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A stored generation outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPattern {
    pub id: Uuid,
    pub component_name: String,
    pub user_request: String,
    pub requirements: Value,
    pub generated_code: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl GenerationPattern {
    pub fn new(
        component_name: impl Into<String>,
        user_request: impl Into<String>,
        requirements: Value,
        generated_code: impl Into<String>,
        success: bool,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            component_name: component_name.into(),
            user_request: user_request.into(),
            requirements,
            generated_code: generated_code.into(),
            success,
            feedback: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_feedback(mut self, feedback: impl Into<String>) -> Self {
        self.feedback = Some(feedback.into());
        self
    }

    /// Text used to embed this pattern for similarity search.
    pub fn embedding_text(&self) -> String {
        format!("{} {}", self.component_name, self.user_request)
    }
}

/// A pattern scored against a query. Computed per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseEntry {
    pub pattern: GenerationPattern,
    pub embedding: Vec<f32>,
    pub similarity: f32,
}

/// Aggregate figures about the knowledge base.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBaseStats {
    pub total_patterns: usize,
    pub successful_patterns: usize,
    pub embedded_patterns: usize,
    pub retrieval_enabled: bool,
}

impl KnowledgeBaseStats {
    pub fn success_rate(&self) -> f32 {
        if self.total_patterns == 0 {
            0.0
        } else {
            self.successful_patterns as f32 / self.total_patterns as f32
        }
    }
}
