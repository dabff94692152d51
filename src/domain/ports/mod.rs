//! Port trait definitions (Hexagonal Architecture)
//!
//! This module defines async trait interfaces that adapters must implement:
//! - CompletionService: prompt in, text out
//! - EmbeddingProvider: text in, vector out
//! - PatternStore: durable generation pattern collection
//! - Toolchain: out-of-process compiler
//!
//! These traits keep the services independent of any vendor or storage.

pub mod completion;
pub mod embedding;
pub mod hash_embedding;
pub mod pattern_store;
pub mod toolchain;

pub use completion::{CompletionError, CompletionRequest, CompletionService};
pub use embedding::{EmbeddingError, EmbeddingProvider};
pub use hash_embedding::{hash_embedding, HashEmbeddingProvider};
pub use pattern_store::PatternStore;
pub use toolchain::Toolchain;
