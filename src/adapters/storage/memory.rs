//! In-memory pattern store for tests and ephemeral runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::errors::DomainResult;
use crate::domain::models::GenerationPattern;
use crate::domain::ports::PatternStore;

#[derive(Default)]
pub struct InMemoryPatternStore {
    patterns: RwLock<Vec<GenerationPattern>>,
}

impl InMemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing patterns.
    pub fn with_patterns(patterns: Vec<GenerationPattern>) -> Self {
        Self {
            patterns: RwLock::new(patterns),
        }
    }

    pub async fn len(&self) -> usize {
        self.patterns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.patterns.read().await.is_empty()
    }
}

#[async_trait]
impl PatternStore for InMemoryPatternStore {
    async fn load_all(&self) -> DomainResult<Vec<GenerationPattern>> {
        Ok(self.patterns.read().await.clone())
    }

    async fn append(&self, pattern: &GenerationPattern) -> DomainResult<()> {
        self.patterns.write().await.push(pattern.clone());
        Ok(())
    }

    async fn write_all(&self, patterns: &[GenerationPattern]) -> DomainResult<()> {
        *self.patterns.write().await = patterns.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_append_and_replace() {
        let store = InMemoryPatternStore::new();
        assert!(store.is_empty().await);

        let p = GenerationPattern::new("Nav", "a nav", json!({}), "<nav/>", true);
        store.append(&p).await.unwrap();
        assert_eq!(store.len().await, 1);

        store.write_all(&[]).await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
