//! Requirements synthesis: free text in, normalized requirements out.
//!
//! Two sources run concurrently: retrieval-augmented synthesis from the
//! knowledge base and a direct parse of the request. When both answer, the
//! retrieval result is the base and the direct parse fills its gaps. When
//! neither answers, a default requirement seeded from prompt hints is
//! returned. Parsing never fails outward.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::domain::models::{CompletionConfig, ComponentRequirement, ParsedRequirements};
use crate::domain::ports::{CompletionRequest, CompletionService};
use crate::services::json_repair::{self, RepairStage};
use crate::services::knowledge_base::KnowledgeBase;
use crate::services::prompt_hints::extract_hints;

/// Floor applied to confidence whenever retrieval contributed.
pub const RAG_CONFIDENCE_FLOOR: f32 = 0.85;
const DIRECT_DEFAULT_CONFIDENCE: f32 = 0.7;
const DEFAULT_CONFIDENCE: f32 = 0.3;

const DIRECT_SYSTEM_PROMPT: &str = "You are a UI requirements analyst. Convert a web component \
request into structured requirements. Respond with a single JSON object only.";

/// Raw entries from one source, before normalization.
#[derive(Debug, Clone)]
struct SourceEntries {
    entries: Vec<Value>,
    confidence: f32,
}

pub struct RequirementsSynthesizer {
    completion: Arc<dyn CompletionService>,
    knowledge_base: Option<Arc<KnowledgeBase>>,
    model: String,
}

impl RequirementsSynthesizer {
    pub fn new(completion: Arc<dyn CompletionService>) -> Self {
        Self {
            completion,
            knowledge_base: None,
            model: CompletionConfig::default().model,
        }
    }

    pub fn with_knowledge_base(mut self, knowledge_base: Arc<KnowledgeBase>) -> Self {
        self.knowledge_base = Some(knowledge_base);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Parse `prompt` into at least one normalized requirement.
    #[instrument(skip(self, prompt), fields(chars = prompt.len()))]
    pub async fn parse(&self, prompt: &str, component_name: Option<&str>) -> ParsedRequirements {
        let (rag, direct) = tokio::join!(
            self.rag_entries(prompt, component_name),
            self.direct_entries(prompt)
        );

        let mut parsed = match (rag, direct) {
            (Some(rag), Some(direct)) => {
                info!("Merging retrieval and direct requirements");
                ParsedRequirements {
                    requirements: normalize_entries(merge_entries(&rag.entries, &direct.entries)),
                    confidence: direct.confidence.max(RAG_CONFIDENCE_FLOOR),
                    reasoning: "merged retrieval-augmented and direct parse".to_string(),
                }
            }
            (Some(rag), None) => ParsedRequirements {
                requirements: normalize_entries(rag.entries),
                confidence: rag.confidence.max(RAG_CONFIDENCE_FLOOR),
                reasoning: "retrieval-augmented synthesis".to_string(),
            },
            (None, Some(direct)) => ParsedRequirements {
                requirements: normalize_entries(direct.entries),
                confidence: direct.confidence,
                reasoning: "direct parse".to_string(),
            },
            (None, None) => {
                warn!("All requirement sources failed, using prompt-derived default");
                ParsedRequirements {
                    requirements: vec![ComponentRequirement::default()],
                    confidence: DEFAULT_CONFIDENCE,
                    reasoning: "default requirements from prompt hints".to_string(),
                }
            }
        };

        if parsed.requirements.is_empty() {
            parsed.requirements.push(ComponentRequirement::default());
        }

        let hints = extract_hints(prompt);
        for requirement in &mut parsed.requirements {
            hints.apply(requirement);
        }

        parsed
    }

    async fn rag_entries(&self, prompt: &str, component_name: Option<&str>) -> Option<SourceEntries> {
        let knowledge_base = self.knowledge_base.as_ref()?;
        match knowledge_base.generate_requirements_with_rag(prompt, component_name).await {
            Ok(Some(Value::Object(map))) => {
                let entries = json_repair::requirement_entries(&map);
                if entries.is_empty() {
                    return None;
                }
                Some(SourceEntries {
                    entries,
                    confidence: confidence_of(&map).unwrap_or(RAG_CONFIDENCE_FLOOR),
                })
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Retrieval-augmented synthesis failed");
                None
            }
        }
    }

    async fn direct_entries(&self, prompt: &str) -> Option<SourceEntries> {
        let request = CompletionRequest::new(self.model.clone(), DIRECT_SYSTEM_PROMPT, direct_prompt(prompt))
            .with_temperature(0.1);

        let response = match self.completion.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Direct requirement parse failed");
                return None;
            }
        };

        let outcome = json_repair::parse_requirements(&response);
        debug!(stage = outcome.stage.as_str(), entries = outcome.entries.len(), "Direct parse");
        if outcome.stage == RepairStage::Default {
            return None;
        }

        Some(SourceEntries {
            entries: outcome.entries,
            confidence: outcome.confidence.unwrap_or(DIRECT_DEFAULT_CONFIDENCE),
        })
    }
}

fn direct_prompt(prompt: &str) -> String {
    format!(
        "Request: {prompt}\n\n\
         Return {{\"requirements\": [ ... ], \"confidence\": 0.0-1.0, \"reasoning\": \"...\"}} where each \
         requirement has layout {{contentPosition, imagePosition, layoutType, direction}}, content \
         {{elements, counts, text}}, styling {{theme, colors, spacing, responsive}} and interactions \
         {{animations, hover, click}}. Positions are left, right, center, top, bottom or none."
    )
}

fn confidence_of(map: &Map<String, Value>) -> Option<f32> {
    map.get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0) as f32)
}

/// Merge two entry lists index by index; leftovers from either side are kept.
fn merge_entries(base: &[Value], fill: &[Value]) -> Vec<Value> {
    let len = base.len().max(fill.len());
    (0..len)
        .filter_map(|i| match (base.get(i), fill.get(i)) {
            (Some(b), Some(f)) => Some(merge_values(b, f)),
            (Some(b), None) => Some(b.clone()),
            (None, Some(f)) => Some(f.clone()),
            (None, None) => None,
        })
        .collect()
}

/// `base` wins; `fill` supplies missing, null or empty fields. Arrays are
/// concatenated base first and objects merged recursively.
fn merge_values(base: &Value, fill: &Value) -> Value {
    match (base, fill) {
        (Value::Object(b), Value::Object(f)) => {
            let mut merged = b.clone();
            for (key, fill_value) in f {
                let next = match merged.get(key) {
                    Some(existing) if !is_blank(existing) => merge_values(existing, fill_value),
                    _ => fill_value.clone(),
                };
                merged.insert(key.clone(), next);
            }
            Value::Object(merged)
        }
        (Value::Array(b), Value::Array(f)) => Value::Array(b.iter().chain(f).cloned().collect()),
        (b, f) if is_blank(b) => f.clone(),
        (b, _) => b.clone(),
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// Objects become one requirement each. Bare strings are gathered as
/// content elements, on the first requirement or a new one.
fn normalize_entries(entries: Vec<Value>) -> Vec<ComponentRequirement> {
    let (objects, strings): (Vec<Value>, Vec<Value>) =
        entries.into_iter().partition(|entry| entry.is_object());

    let mut requirements: Vec<ComponentRequirement> =
        objects.iter().map(ComponentRequirement::from_value).collect();

    let elements: Vec<String> = strings
        .iter()
        .filter_map(Value::as_str)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    if !elements.is_empty() {
        if requirements.is_empty() {
            requirements.push(ComponentRequirement::default());
        }
        if let Some(first) = requirements.first_mut() {
            for element in elements {
                if !first.content.elements.contains(&element) {
                    first.content.elements.push(element);
                }
            }
        }
    }

    requirements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::completion::{ScriptedCompletionService, ScriptedReply};
    use crate::domain::ports::CompletionError;
    use serde_json::json;

    const HERO: &str = "create a hero section with a headline on the right and an image on the left";

    fn synthesizer(reply: ScriptedReply) -> RequirementsSynthesizer {
        let completion = ScriptedCompletionService::new().on("requirements analyst", reply);
        RequirementsSynthesizer::new(Arc::new(completion))
    }

    #[tokio::test]
    async fn test_direct_parse() {
        let parser = synthesizer(ScriptedReply::text(
            r#"{"requirements": [{"layout": {"contentPosition": "right", "imagePosition": "left"}}], "confidence": 0.9}"#,
        ));
        let parsed = parser.parse(HERO, None).await;

        assert_eq!(parsed.confidence, 0.9);
        assert_eq!(parsed.reasoning, "direct parse");
        let primary = parsed.primary();
        assert_eq!(primary.layout.content_position, "right");
        assert_eq!(primary.layout.image_position, "left");
        assert_eq!(primary.styling.theme, "light");
    }

    #[tokio::test]
    async fn test_backend_failure_falls_back_to_hints() {
        let parser = synthesizer(ScriptedReply::fail(CompletionError::Timeout));
        let parsed = parser.parse(HERO, None).await;

        assert_eq!(parsed.requirements.len(), 1);
        assert_eq!(parsed.confidence, DEFAULT_CONFIDENCE);
        assert_eq!(parsed.primary().layout.content_position, "right");
        assert_eq!(parsed.primary().layout.image_position, "left");
    }

    #[tokio::test]
    async fn test_unusable_text_is_default() {
        let parser = synthesizer(ScriptedReply::text("I'd be happy to help!"));
        let parsed = parser.parse("something nice", None).await;
        assert_eq!(parsed.requirements, vec![ComponentRequirement::default()]);
    }

    #[test]
    fn test_merge_values_fills_gaps() {
        let rag = json!({
            "layout": {"contentPosition": "left", "imagePosition": ""},
            "content": {"elements": ["headline"]},
        });
        let direct = json!({
            "layout": {"contentPosition": "right", "imagePosition": "right", "layoutType": "split"},
            "content": {"elements": ["headline", "button"]},
            "styling": {"theme": "dark"},
        });

        let merged = merge_values(&rag, &direct);
        assert_eq!(merged["layout"]["contentPosition"], "left");
        assert_eq!(merged["layout"]["imagePosition"], "right");
        assert_eq!(merged["layout"]["layoutType"], "split");
        assert_eq!(merged["content"]["elements"], json!(["headline", "headline", "button"]));
        assert_eq!(merged["styling"]["theme"], "dark");
    }

    #[test]
    fn test_merge_entries_keeps_leftovers() {
        let merged = merge_entries(&[json!({"a": 1})], &[json!({"b": 2}), json!("navbar")]);
        assert_eq!(merged, vec![json!({"a": 1, "b": 2}), json!("navbar")]);
    }

    #[test]
    fn test_normalize_strings_become_elements() {
        let requirements = normalize_entries(vec![json!("logo"), json!("links")]);
        assert_eq!(requirements.len(), 1);
        assert_eq!(requirements[0].content.elements, vec!["logo", "links"]);

        let requirements = normalize_entries(vec![json!({"content": {"elements": ["logo"]}}), json!("logo")]);
        assert_eq!(requirements[0].content.elements, vec!["logo"]);
    }
}
