//! Pagewright - page descriptions in, validated markup components out
//!
//! A free-text request is planned into tasks, parsed into structured
//! requirements (with retrieval over past generations), generated by several
//! model strategies in parallel with a judge picking the winner, compiled and
//! repaired by an external toolchain, and finally recorded as a pattern for
//! future retrieval.
//!
//! # Architecture
//!
//! This crate follows Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): models, errors and the port traits
//! - **Service Layer** (`services`): embedding cache, knowledge base,
//!   requirements synthesis, generation, validation and orchestration
//! - **Adapters** (`adapters`): completion, embedding, storage and toolchain
//!   implementations of the ports
//! - **Application Layer** (`application`): the [`Pagewright`] facade
//! - **Infrastructure Layer** (`infrastructure`): configuration, logging,
//!   retry policy and project setup
//! - **CLI Layer** (`cli`): command-line interface
//!
//! # Example
//!
//! ```ignore
//! use pagewright::{ConfigLoader, Pagewright};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pagewright = Pagewright::builder(ConfigLoader::load()?).build()?;
//!     pagewright.init().await?;
//!     let results = pagewright
//!         .orchestrate("a hero with a headline on the right and an image on the left")
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&results)?);
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use application::{GeneratedComponent, Pagewright, PagewrightBuilder};
pub use domain::errors::{DomainError, DomainResult, GenerationError, ValidationError};
pub use domain::models::{
    AgentOutput, AgentResult, ComponentRequirement, Config, GenerationPattern, GenerationResult,
    OrchestrationPlan, ParsedRequirements, TaskKind, ValidationReport,
};
pub use domain::ports::{
    CompletionError, CompletionService, EmbeddingError, EmbeddingProvider, PatternStore, Toolchain,
};
pub use infrastructure::config::{ConfigError, ConfigLoader};
