//! The `Pagewright` facade.
//!
//! Wires every service from a [`Config`] and exposes the three entry points:
//! [`orchestrate`](Pagewright::orchestrate),
//! [`generate_component`](Pagewright::generate_component) and
//! [`validate_and_fix`](Pagewright::validate_and_fix). Adapters can be
//! swapped through [`PagewrightBuilder`] before `build`.

use std::sync::Arc;
use tracing::{info, instrument};

use crate::adapters::completion::{AnthropicCompletionService, ScriptedCompletionService};
use crate::adapters::embeddings::{OpenAiEmbeddingConfig, OpenAiEmbeddingProvider};
use crate::adapters::storage::JsonFilePatternStore;
use crate::adapters::toolchain::CommandToolchain;
use crate::domain::errors::DomainResult;
use crate::domain::models::{
    AgentResult, CompletionBackend, Config, EmbeddingBackend, GenerationResult, OrchestrationPlan,
    ParsedRequirements, ValidationReport,
};
use crate::domain::ports::{
    CompletionService, EmbeddingProvider, HashEmbeddingProvider, PatternStore, Toolchain,
};
use crate::infrastructure::retry::RetryPolicy;
use crate::services::orchestrator::{
    GenerationAgent, LearningAgent, Orchestrator, RagAgent, RequirementsAgent, ValidationAgent,
};
use crate::services::{
    EmbeddingCache, KnowledgeBase, MultiStrategyGenerator, RequirementsSynthesizer, Validator,
};

/// Requirements and the code generated from them.
#[derive(Debug, Clone)]
pub struct GeneratedComponent {
    pub requirements: ParsedRequirements,
    pub result: GenerationResult,
}

pub struct Pagewright {
    config: Config,
    embeddings: Arc<EmbeddingCache>,
    knowledge_base: Arc<KnowledgeBase>,
    synthesizer: Arc<RequirementsSynthesizer>,
    generator: Arc<MultiStrategyGenerator>,
    validator: Arc<Validator>,
    orchestrator: Orchestrator,
}

impl Pagewright {
    pub fn builder(config: Config) -> PagewrightBuilder {
        PagewrightBuilder::new(config)
    }

    /// Load the knowledge base. Must run before anything records patterns.
    pub async fn init(&self) -> DomainResult<()> {
        self.knowledge_base.init().await
    }

    pub async fn close(&self) {
        self.knowledge_base.close().await;
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.knowledge_base
    }

    pub fn generator(&self) -> &Arc<MultiStrategyGenerator> {
        &self.generator
    }

    pub fn embeddings(&self) -> &Arc<EmbeddingCache> {
        &self.embeddings
    }

    pub async fn plan(&self, request: &str) -> OrchestrationPlan {
        self.orchestrator.plan(request).await
    }

    pub async fn execute(&self, plan: &OrchestrationPlan, request: &str) -> Vec<AgentResult> {
        self.orchestrator.execute(plan, request).await
    }

    /// Plan and run every task for `request`.
    pub async fn orchestrate(&self, request: &str) -> Vec<AgentResult> {
        self.orchestrator.orchestrate(request).await
    }

    /// Parse `request` and generate code for its primary requirement,
    /// without planning, validation or learning.
    #[instrument(skip(self, request))]
    pub async fn generate_component(
        &self,
        request: &str,
        component_name: Option<&str>,
    ) -> DomainResult<GeneratedComponent> {
        let requirements = self.synthesizer.parse(request, component_name).await;
        let result = self
            .generator
            .generate(&requirements.primary(), request)
            .await?;
        Ok(GeneratedComponent {
            requirements,
            result,
        })
    }

    pub async fn validate_and_fix(&self, code: &str) -> DomainResult<String> {
        self.validator.validate_and_fix(code).await
    }

    pub async fn validate_and_fix_report(&self, code: &str) -> DomainResult<ValidationReport> {
        self.validator.validate_and_fix_report(code).await
    }
}

/// Builds a [`Pagewright`]; any adapter left unset is constructed from
/// the configuration.
pub struct PagewrightBuilder {
    config: Config,
    completion: Option<Arc<dyn CompletionService>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    pattern_store: Option<Arc<dyn PatternStore>>,
    toolchain: Option<Arc<dyn Toolchain>>,
}

impl PagewrightBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            completion: None,
            embedding_provider: None,
            pattern_store: None,
            toolchain: None,
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    pub fn with_pattern_store(mut self, store: Arc<dyn PatternStore>) -> Self {
        self.pattern_store = Some(store);
        self
    }

    pub fn with_toolchain(mut self, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    /// Wire every service. A missing completion API key and an invalid
    /// strategy set are fatal here.
    pub fn build(self) -> DomainResult<Pagewright> {
        let config = self.config;

        let completion: Arc<dyn CompletionService> = match self.completion {
            Some(completion) => completion,
            None => match config.completion.backend {
                CompletionBackend::Anthropic => {
                    Arc::new(AnthropicCompletionService::new(&config.completion)?)
                }
                CompletionBackend::Scripted => Arc::new(ScriptedCompletionService::offline()),
            },
        };

        let provider: Arc<dyn EmbeddingProvider> = match self.embedding_provider {
            Some(provider) => provider,
            None => match config.embedding.backend {
                EmbeddingBackend::Openai => Arc::new(OpenAiEmbeddingProvider::new(
                    OpenAiEmbeddingConfig::from(&config.embedding),
                )),
                EmbeddingBackend::Hash => {
                    Arc::new(HashEmbeddingProvider::new(config.embedding.fallback_dimension))
                }
            },
        };

        let store: Arc<dyn PatternStore> = self
            .pattern_store
            .unwrap_or_else(|| Arc::new(JsonFilePatternStore::new(&config.rag.store_path)));
        let toolchain: Arc<dyn Toolchain> = self
            .toolchain
            .unwrap_or_else(|| Arc::new(CommandToolchain::from_config(&config.validation)));

        let model = config.completion.model.clone();
        let embeddings = Arc::new(EmbeddingCache::new(
            provider,
            &config.embedding,
            RetryPolicy::from_config(&config.retry),
        ));
        let knowledge_base = Arc::new(
            KnowledgeBase::new(store, embeddings.clone(), completion.clone(), config.rag.clone())
                .with_model(model.clone()),
        );
        let synthesizer = Arc::new(
            RequirementsSynthesizer::new(completion.clone())
                .with_knowledge_base(knowledge_base.clone())
                .with_model(model.clone()),
        );
        let generator = Arc::new(MultiStrategyGenerator::new(
            completion.clone(),
            &config.generation,
        )?);
        let validator = Arc::new(
            Validator::new(toolchain, completion.clone())
                .with_model(model)
                .with_max_retries(config.validation.max_retries),
        );

        let orchestrator = Orchestrator::new(completion.clone(), config.orchestrator.clone())
            .with_validation_in_fallback(config.validation.in_fallback_plan)
            .with_agent(Arc::new(RequirementsAgent::new(synthesizer.clone())))
            .with_agent(Arc::new(GenerationAgent::new(generator.clone())))
            .with_agent(Arc::new(ValidationAgent::new(validator.clone())))
            .with_agent(Arc::new(LearningAgent::new(knowledge_base.clone())))
            .with_agent(Arc::new(RagAgent::new(
                knowledge_base.clone(),
                config.rag.similar_limit,
            )));

        info!(
            completion = completion.name(),
            embeddings = embeddings.provider_name(),
            strategies = generator.strategies().len(),
            "Pagewright ready"
        );

        Ok(Pagewright {
            config,
            embeddings,
            knowledge_base,
            synthesizer,
            generator,
            validator,
            orchestrator,
        })
    }
}
