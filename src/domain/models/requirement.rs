//! Component requirement domain model.
//!
//! A requirement is the structured description of one markup component.
//! Model output arrives as loosely shaped JSON; [`ComponentRequirement::from_value`]
//! is the lenient boundary that turns any JSON value into a fully populated
//! requirement with all four sections present.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Where content and imagery sit and how the component flows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutSpec {
    pub content_position: String,
    pub image_position: String,
    pub layout_type: String,
    pub direction: String,
}

impl Default for LayoutSpec {
    fn default() -> Self {
        Self {
            content_position: "center".to_string(),
            image_position: "none".to_string(),
            layout_type: "stack".to_string(),
            direction: "vertical".to_string(),
        }
    }
}

/// What the component contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSpec {
    pub elements: Vec<String>,
    pub counts: BTreeMap<String, u32>,
    pub text: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StylingSpec {
    pub theme: String,
    pub colors: Vec<String>,
    pub spacing: String,
    pub responsive: bool,
}

impl Default for StylingSpec {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            colors: Vec::new(),
            spacing: "normal".to_string(),
            responsive: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionSpec {
    pub animations: Vec<String>,
    pub hover: String,
    pub click: String,
}

impl Default for InteractionSpec {
    fn default() -> Self {
        Self {
            animations: Vec::new(),
            hover: "none".to_string(),
            click: "none".to_string(),
        }
    }
}

/// A normalized component requirement. All four sections are always present.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRequirement {
    pub layout: LayoutSpec,
    pub content: ContentSpec,
    pub styling: StylingSpec,
    pub interactions: InteractionSpec,
}

impl ComponentRequirement {
    /// Leniently normalize an arbitrary JSON value.
    ///
    /// Missing sections, wrong types and nulls fall back to defaults field by
    /// field. A bare string becomes a single content element. Never fails.
    pub fn from_value(value: &Value) -> Self {
        let mut requirement = Self::default();

        let obj = match value {
            Value::Object(obj) => obj,
            Value::String(s) if !s.trim().is_empty() => {
                requirement.content.elements.push(s.trim().to_string());
                return requirement;
            }
            _ => return requirement,
        };

        if let Some(layout) = obj.get("layout").and_then(Value::as_object) {
            let l = &mut requirement.layout;
            assign_str(&mut l.content_position, layout, "contentPosition");
            assign_str(&mut l.image_position, layout, "imagePosition");
            assign_str(&mut l.layout_type, layout, "layoutType");
            assign_str(&mut l.direction, layout, "direction");
        }

        if let Some(content) = obj.get("content").and_then(Value::as_object) {
            let c = &mut requirement.content;
            c.elements = string_list(content.get("elements"));
            if let Some(counts) = content.get("counts").and_then(Value::as_object) {
                for (key, v) in counts {
                    if let Some(n) = coerce_count(v) {
                        c.counts.insert(key.clone(), n);
                    }
                }
            }
            if let Some(text) = content.get("text").and_then(Value::as_object) {
                for (key, v) in text {
                    if let Some(s) = scalar_to_string(v) {
                        c.text.insert(key.clone(), s);
                    }
                }
            }
        }

        if let Some(styling) = obj.get("styling").and_then(Value::as_object) {
            let s = &mut requirement.styling;
            assign_str(&mut s.theme, styling, "theme");
            s.colors = string_list(styling.get("colors"));
            assign_str(&mut s.spacing, styling, "spacing");
            if let Some(flag) = styling.get("responsive").and_then(coerce_bool) {
                s.responsive = flag;
            }
        }

        if let Some(interactions) = obj.get("interactions").and_then(Value::as_object) {
            let i = &mut requirement.interactions;
            i.animations = string_list(interactions.get("animations"));
            assign_flag_or_str(&mut i.hover, interactions.get("hover"));
            assign_flag_or_str(&mut i.click, interactions.get("click"));
        }

        requirement
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn assign_str(target: &mut String, obj: &Map<String, Value>, key: &str) {
    if let Some(s) = obj.get(key).and_then(scalar_to_string) {
        if !s.trim().is_empty() {
            *target = s.trim().to_string();
        }
    }
}

/// `hover: true` becomes "enabled", `false` stays "none", strings pass through.
fn assign_flag_or_str(target: &mut String, value: Option<&Value>) {
    match value {
        Some(Value::Bool(true)) => *target = "enabled".to_string(),
        Some(Value::Bool(false)) => *target = "none".to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => *target = s.trim().to_string(),
        _ => {}
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(scalar_to_string)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

fn coerce_count(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" => Some(true),
            "false" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Output of the requirements synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedRequirements {
    /// At least one normalized requirement.
    pub requirements: Vec<ComponentRequirement>,
    /// Confidence in [0, 1].
    pub confidence: f32,
    /// How the result was obtained (direct, rag, merged, default).
    pub reasoning: String,
}

impl ParsedRequirements {
    /// The requirement used to drive generation.
    pub fn primary(&self) -> ComponentRequirement {
        self.requirements.first().cloned().unwrap_or_default()
    }
}
