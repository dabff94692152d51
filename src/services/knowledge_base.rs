//! Retrieval-augmented knowledge base of past generations.
//!
//! Holds every [`GenerationPattern`] recorded so far and serves
//! nearest-neighbour lookups over them. Pattern embeddings are computed
//! lazily on first lookup and kept in memory; the durable store only holds
//! the patterns themselves.
//!
//! The knowledge base must be [`init`](KnowledgeBase::init)ed before use and
//! can be [`close`](KnowledgeBase::close)d to drop its in-memory state.

use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    CompletionConfig, GenerationPattern, KnowledgeBaseEntry, KnowledgeBaseStats, RagConfig,
};
use crate::domain::ports::{hash_embedding, CompletionRequest, CompletionService, PatternStore};
use crate::services::embedding_cache::{cosine_similarity, EmbeddingCache};
use crate::services::json_repair;

const RAG_SYSTEM_PROMPT: &str = "You derive structured UI component requirements from similar \
past generations. Reuse what worked, avoid what failed. Respond with a single JSON object only.";

#[derive(Default)]
struct KnowledgeState {
    patterns: Vec<GenerationPattern>,
    embeddings: HashMap<Uuid, Vec<f32>>,
}

pub struct KnowledgeBase {
    store: Arc<dyn PatternStore>,
    embeddings: Arc<EmbeddingCache>,
    completion: Arc<dyn CompletionService>,
    config: RagConfig,
    model: String,
    state: RwLock<Option<KnowledgeState>>,
}

impl KnowledgeBase {
    pub fn new(
        store: Arc<dyn PatternStore>,
        embeddings: Arc<EmbeddingCache>,
        completion: Arc<dyn CompletionService>,
        config: RagConfig,
    ) -> Self {
        Self {
            store,
            embeddings,
            completion,
            config,
            model: CompletionConfig::default().model,
            state: RwLock::new(None),
        }
    }

    /// Model used for retrieval-augmented synthesis.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn retrieval_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Load the pattern collection. Calling it again reloads from the store.
    #[instrument(skip(self))]
    pub async fn init(&self) -> DomainResult<()> {
        let patterns = self.store.load_all().await?;
        info!(patterns = patterns.len(), retrieval = self.config.enabled, "Knowledge base loaded");
        *self.state.write().await = Some(KnowledgeState {
            patterns,
            embeddings: HashMap::new(),
        });
        Ok(())
    }

    /// Drop in-memory patterns and embeddings.
    pub async fn close(&self) {
        if self.state.write().await.take().is_some() {
            debug!("Knowledge base closed");
        }
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.read().await.is_some()
    }

    /// Record a pattern. A blank request is replaced with a synthesized one.
    /// The pattern is persisted before a single embedding attempt; a failed
    /// attempt is left to the lazy path in lookups.
    #[instrument(skip(self, pattern), fields(component = %pattern.component_name))]
    pub async fn add_pattern(&self, mut pattern: GenerationPattern) -> DomainResult<Uuid> {
        if !self.is_initialized().await {
            return Err(DomainError::NotInitialized);
        }

        if pattern.user_request.trim().is_empty() {
            pattern.user_request = format!("Generate a {} component", pattern.component_name);
        }

        self.store.append(&pattern).await?;

        let id = pattern.id;
        let text = pattern.embedding_text();
        {
            let mut guard = self.state.write().await;
            let state = guard.as_mut().ok_or(DomainError::NotInitialized)?;
            state.patterns.push(pattern);
            debug!(pattern_id = %id, total = state.patterns.len(), "Pattern recorded");
        }

        match self.embeddings.embed_once(&text).await {
            Ok(vector) => {
                if let Some(state) = self.state.write().await.as_mut() {
                    state.embeddings.insert(id, vector);
                }
            }
            Err(e) => debug!(pattern_id = %id, error = %e, "Pattern embedding deferred to first lookup"),
        }
        Ok(id)
    }

    /// Up to `limit` patterns ranked by cosine similarity to `query`.
    ///
    /// `component_filter` matches component names case-insensitively. A
    /// blank query or disabled retrieval yields no results.
    #[instrument(skip(self))]
    pub async fn find_similar_patterns(
        &self,
        query: &str,
        component_filter: Option<&str>,
        limit: usize,
    ) -> DomainResult<Vec<KnowledgeBaseEntry>> {
        if !self.config.enabled || query.trim().is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let candidates: Vec<(GenerationPattern, Option<Vec<f32>>)> = {
            let guard = self.state.read().await;
            let state = guard.as_ref().ok_or(DomainError::NotInitialized)?;
            state
                .patterns
                .iter()
                .filter(|p| {
                    component_filter
                        .is_none_or(|name| p.component_name.eq_ignore_ascii_case(name.trim()))
                })
                .map(|p| (p.clone(), state.embeddings.get(&p.id).cloned()))
                .collect()
        };

        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query_vector = self.embeddings.embed_or_fallback(query).await;

        let mut fresh: Vec<(Uuid, Vec<f32>)> = Vec::new();
        let mut entries = Vec::with_capacity(candidates.len());
        for (pattern, cached) in candidates {
            let text = pattern.embedding_text();
            let embedding = if query_vector.degraded {
                hash_embedding(&EmbeddingCache::normalize_key(&text), query_vector.vector.len())
            } else if let Some(vector) = cached {
                vector
            } else {
                let embedded = self.embeddings.embed_or_fallback(&text).await;
                if !embedded.degraded {
                    fresh.push((pattern.id, embedded.vector.clone()));
                }
                embedded.vector
            };

            let similarity = cosine_similarity(&query_vector.vector, &embedding);
            entries.push(KnowledgeBaseEntry {
                pattern,
                embedding,
                similarity,
            });
        }

        if !fresh.is_empty() {
            if let Some(state) = self.state.write().await.as_mut() {
                debug!(count = fresh.len(), "Caching lazily computed pattern embeddings");
                state.embeddings.extend(fresh);
            }
        }

        entries.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        entries.truncate(limit);
        Ok(entries)
    }

    /// Synthesize requirements from similar past patterns.
    ///
    /// Returns `None` when nothing similar exists or the response holds no
    /// JSON object.
    #[instrument(skip(self))]
    pub async fn generate_requirements_with_rag(
        &self,
        query: &str,
        component_filter: Option<&str>,
    ) -> DomainResult<Option<Value>> {
        let similar = self
            .find_similar_patterns(query, component_filter, self.config.similar_limit)
            .await?;
        if similar.is_empty() {
            debug!("No similar patterns, skipping retrieval synthesis");
            return Ok(None);
        }

        let request = CompletionRequest::new(
            self.model.clone(),
            RAG_SYSTEM_PROMPT,
            build_rag_prompt(query, &similar),
        )
        .with_temperature(0.2);

        let response = self.completion.complete(request).await?;
        match json_repair::parse_json_object(&response) {
            Some((map, stage)) => {
                debug!(stage = stage.as_str(), patterns = similar.len(), "Retrieval synthesis parsed");
                Ok(Some(Value::Object(map)))
            }
            None => {
                warn!("Retrieval synthesis returned no JSON object");
                Ok(None)
            }
        }
    }

    /// Snapshot of every stored pattern.
    pub async fn patterns(&self) -> DomainResult<Vec<GenerationPattern>> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(DomainError::NotInitialized)?;
        Ok(state.patterns.clone())
    }

    pub async fn stats(&self) -> DomainResult<KnowledgeBaseStats> {
        let guard = self.state.read().await;
        let state = guard.as_ref().ok_or(DomainError::NotInitialized)?;
        Ok(KnowledgeBaseStats {
            total_patterns: state.patterns.len(),
            successful_patterns: state.patterns.iter().filter(|p| p.success).count(),
            embedded_patterns: state.embeddings.len(),
            retrieval_enabled: self.config.enabled,
        })
    }
}

fn build_rag_prompt(query: &str, similar: &[KnowledgeBaseEntry]) -> String {
    let mut prompt = format!("Request: {query}\n\nSimilar past generations:\n");
    for (i, entry) in similar.iter().enumerate() {
        let pattern = &entry.pattern;
        prompt.push_str(&format!(
            "\n[{}] component: {}\nrequest: {}\nsuccess: {}\n",
            i + 1,
            pattern.component_name,
            pattern.user_request,
            pattern.success
        ));
        if let Some(feedback) = &pattern.feedback {
            prompt.push_str(&format!("feedback: {feedback}\n"));
        }
        prompt.push_str(&format!("requirements: {}\n", pattern.requirements));
    }
    prompt.push_str(
        "\nReturn {\"requirements\": [ ... ], \"confidence\": 0.0-1.0} where each requirement has \
         layout {contentPosition, imagePosition, layoutType, direction}, content {elements, counts, \
         text}, styling {theme, colors, spacing, responsive} and interactions {animations, hover, click}.",
    );
    prompt
}
