//! Multi-strategy generation with a judge call.
//!
//! Every configured strategy runs concurrently against the completion
//! service. Once all have settled:
//!
//! - no success: [`GenerationError::NoViableGeneration`]
//! - one success: returned as produced, no judge call
//! - several: a judge call sees a bounded preview of each candidate and
//!   picks one; an unusable verdict selects the first success
//!
//! Text mode refuses strategies that reference a vision model, both at
//! construction and on every call.

use chrono::Utc;
use futures::future::join_all;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::GenerationError;
use crate::domain::models::{
    CandidateOutcome, ComponentRequirement, GenerationConfig, GenerationMode, GenerationRecord,
    GenerationResult, GenerationStrategy,
};
use crate::domain::ports::{CompletionRequest, CompletionService};
use crate::services::code_extraction::extract_code;
use crate::services::json_repair;

const GENERATION_INSTRUCTIONS: &str = "Write one self-contained markup component that satisfies \
the requirements. Return the component in a single fenced code block with no commentary.";

const JUDGE_SYSTEM_PROMPT: &str = "You judge candidate markup components against a request. \
Respond with JSON only: {\"selectedIndex\": <zero-based index>, \"reasoning\": \"...\", \
\"confidence\": 0.0-1.0}.";

const BASE_CONFIDENCE: f32 = 0.6;
const FENCED_BONUS: f32 = 0.15;
const SUBSTANTIAL_BONUS: f32 = 0.1;
const SUBSTANTIAL_CHARS: usize = 200;
const MAX_CANDIDATE_CONFIDENCE: f32 = 0.95;

pub struct MultiStrategyGenerator {
    completion: Arc<dyn CompletionService>,
    strategies: Vec<GenerationStrategy>,
    mode: GenerationMode,
    judge_model: String,
    preview_chars: usize,
    history: RwLock<Vec<GenerationRecord>>,
}

impl MultiStrategyGenerator {
    /// Build a generator. Fails when no strategy is configured or a vision
    /// model is configured in text mode.
    pub fn new(completion: Arc<dyn CompletionService>, config: &GenerationConfig) -> Result<Self, GenerationError> {
        let mut strategies = config.strategies.clone();
        strategies.sort_by_key(|s| s.priority);
        check_strategies(&strategies, config.mode)?;

        Ok(Self {
            completion,
            strategies,
            mode: config.mode,
            judge_model: config.judge_model.clone(),
            preview_chars: config.preview_chars,
            history: RwLock::new(Vec::new()),
        })
    }

    /// Strategies in run order.
    pub fn strategies(&self) -> &[GenerationStrategy] {
        &self.strategies
    }

    pub fn mode(&self) -> GenerationMode {
        self.mode
    }

    #[instrument(skip(self, requirements, original_request), fields(strategies = self.strategies.len()))]
    pub async fn generate(
        &self,
        requirements: &ComponentRequirement,
        original_request: &str,
    ) -> Result<GenerationResult, GenerationError> {
        check_strategies(&self.strategies, self.mode)?;

        let user_prompt = generation_prompt(requirements, original_request);
        let outcomes: Vec<CandidateOutcome> = join_all(
            self.strategies
                .iter()
                .map(|strategy| self.run_strategy(strategy, &user_prompt)),
        )
        .await;

        let successes: Vec<&GenerationResult> = outcomes
            .iter()
            .filter_map(|o| match o {
                CandidateOutcome::Succeeded(result) => Some(result),
                CandidateOutcome::Failed { .. } => None,
            })
            .collect();

        info!(
            succeeded = successes.len(),
            failed = outcomes.len() - successes.len(),
            "All strategies settled"
        );

        let (selected, judged) = match successes.as_slice() {
            [] => (None, false),
            [only] => (Some((*only).clone()), false),
            many => (Some(self.judge(many, original_request).await), true),
        };

        let failures: Vec<String> = outcomes
            .iter()
            .filter_map(|o| match o {
                CandidateOutcome::Failed { strategy, error } => Some(format!("{strategy}: {error}")),
                CandidateOutcome::Succeeded(_) => None,
            })
            .collect();
        let attempted = outcomes.len();

        self.history.write().await.push(GenerationRecord {
            id: Uuid::new_v4(),
            original_request: original_request.to_string(),
            requirements: requirements.clone(),
            candidates: outcomes,
            selected: selected.clone(),
            judged,
            timestamp: Utc::now(),
        });

        selected.ok_or(GenerationError::NoViableGeneration {
            attempted,
            failures,
        })
    }

    /// Snapshot of every run so far, oldest first.
    pub async fn history(&self) -> Vec<GenerationRecord> {
        self.history.read().await.clone()
    }

    pub async fn history_len(&self) -> usize {
        self.history.read().await.len()
    }

    async fn run_strategy(&self, strategy: &GenerationStrategy, user_prompt: &str) -> CandidateOutcome {
        let system_prompt = if strategy.system_prompt.trim().is_empty() {
            GENERATION_INSTRUCTIONS.to_string()
        } else {
            format!("{}\n\n{}", strategy.system_prompt.trim(), GENERATION_INSTRUCTIONS)
        };

        let request = CompletionRequest::new(strategy.model_id.clone(), system_prompt, user_prompt)
            .with_temperature(strategy.temperature)
            .with_max_tokens(strategy.max_tokens);

        let response = match self.completion.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                warn!(strategy = %strategy.name, error = %e, "Strategy failed");
                return CandidateOutcome::Failed {
                    strategy: strategy.name.clone(),
                    error: e.to_string(),
                };
            }
        };

        let extracted = extract_code(&response);
        if extracted.code.trim().is_empty() {
            return CandidateOutcome::Failed {
                strategy: strategy.name.clone(),
                error: "response contained no code".to_string(),
            };
        }

        let mut confidence = BASE_CONFIDENCE;
        if extracted.fenced {
            confidence += FENCED_BONUS;
        }
        if extracted.code.len() >= SUBSTANTIAL_CHARS {
            confidence += SUBSTANTIAL_BONUS;
        }

        let mut metadata = BTreeMap::new();
        metadata.insert("model".to_string(), json!(strategy.model_id));
        metadata.insert("temperature".to_string(), json!(strategy.temperature));
        metadata.insert("fenced".to_string(), json!(extracted.fenced));

        debug!(strategy = %strategy.name, chars = extracted.code.len(), "Candidate produced");
        CandidateOutcome::Succeeded(GenerationResult {
            code: extracted.code,
            confidence: confidence.min(MAX_CANDIDATE_CONFIDENCE),
            reasoning: format!("Generated by the {} strategy", strategy.name),
            strategy: strategy.name.clone(),
            metadata,
        })
    }

    /// Pick among two or more candidates. Never fails; any unusable verdict
    /// falls back to the first candidate.
    async fn judge(&self, candidates: &[&GenerationResult], original_request: &str) -> GenerationResult {
        let request = CompletionRequest::new(
            self.judge_model.clone(),
            JUDGE_SYSTEM_PROMPT,
            judge_prompt(candidates, original_request, self.preview_chars),
        )
        .with_temperature(0.0)
        .with_max_tokens(512);

        let verdict = match self.completion.complete(request).await {
            Ok(response) => parse_verdict(&response, candidates.len()),
            Err(e) => {
                warn!(error = %e, "Judge call failed");
                None
            }
        };

        match verdict {
            Some(verdict) => {
                info!(selected = verdict.index, strategy = %candidates[verdict.index].strategy, "Judge selected candidate");
                let mut selected = candidates[verdict.index].clone();
                if let Some(confidence) = verdict.confidence {
                    selected.confidence = confidence;
                }
                if let Some(reasoning) = verdict.reasoning {
                    selected.reasoning = reasoning;
                }
                selected.metadata.insert("judged".to_string(), Value::Bool(true));
                selected.metadata.insert("candidates".to_string(), json!(candidates.len()));
                selected
            }
            None => {
                warn!("Judge verdict unusable, selecting first successful candidate");
                let mut selected = candidates[0].clone();
                selected.metadata.insert("judge_fallback".to_string(), Value::Bool(true));
                selected.metadata.insert("candidates".to_string(), json!(candidates.len()));
                selected
            }
        }
    }
}

fn check_strategies(strategies: &[GenerationStrategy], mode: GenerationMode) -> Result<(), GenerationError> {
    if strategies.is_empty() {
        return Err(GenerationError::NoStrategies);
    }
    if mode == GenerationMode::Text {
        if let Some(strategy) = strategies.iter().find(|s| s.references_vision_model()) {
            return Err(GenerationError::VisionModelInTextMode {
                strategy: strategy.name.clone(),
                model_id: strategy.model_id.clone(),
            });
        }
    }
    Ok(())
}

fn generation_prompt(requirements: &ComponentRequirement, original_request: &str) -> String {
    let requirements_json =
        serde_json::to_string_pretty(requirements).unwrap_or_else(|_| requirements.to_value().to_string());
    format!("Request: {original_request}\n\nRequirements:\n{requirements_json}\n")
}

fn judge_prompt(candidates: &[&GenerationResult], original_request: &str, preview_chars: usize) -> String {
    let mut prompt = format!("Request: {original_request}\n\nCandidates:\n");
    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "\n--- Candidate {i} ({}) ---\n{}\n",
            candidate.strategy,
            preview(&candidate.code, preview_chars)
        ));
    }
    prompt.push_str("\nSelect the candidate that best satisfies the request.");
    prompt
}

/// First `max_chars` characters, on a char boundary.
fn preview(code: &str, max_chars: usize) -> &str {
    match code.char_indices().nth(max_chars) {
        Some((idx, _)) => &code[..idx],
        None => code,
    }
}

struct Verdict {
    index: usize,
    reasoning: Option<String>,
    confidence: Option<f32>,
}

fn parse_verdict(response: &str, candidates: usize) -> Option<Verdict> {
    let (map, _) = json_repair::parse_json_object(response)?;
    let index = match map.get("selectedIndex")? {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                .map(|f| f as u64)
        })?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    let index = usize::try_from(index).ok().filter(|i| *i < candidates)?;

    Some(Verdict {
        index,
        reasoning: map
            .get("reasoning")
            .and_then(Value::as_str)
            .map(ToString::to_string),
        confidence: map
            .get("confidence")
            .and_then(Value::as_f64)
            .map(|c| c.clamp(0.0, 1.0) as f32),
    })
}
