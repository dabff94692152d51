use async_trait::async_trait;

use crate::domain::errors::DomainResult;
use crate::domain::models::GenerationPattern;

/// Durable storage for the generation pattern collection
///
/// A read-all / append / write-all collection keyed by pattern id. No
/// transactional guarantees are assumed beyond "last full write wins";
/// implementations must serialize their own writes so concurrent appends
/// never leave a partially written collection behind.
#[async_trait]
pub trait PatternStore: Send + Sync {
    /// Load every stored pattern
    ///
    /// Returns an empty collection if nothing has been written yet.
    async fn load_all(&self) -> DomainResult<Vec<GenerationPattern>>;

    /// Append a single pattern
    ///
    /// # Errors
    /// Returns error if the collection cannot be read back or rewritten
    async fn append(&self, pattern: &GenerationPattern) -> DomainResult<()>;

    /// Replace the whole collection
    async fn write_all(&self, patterns: &[GenerationPattern]) -> DomainResult<()>;
}
