//! JSON file pattern store.
//!
//! The whole collection lives in one pretty-printed JSON array. Writes are
//! serialized behind an async mutex and land atomically: the new collection
//! is written to a sibling temp file which is then renamed over the target.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::GenerationPattern;
use crate::domain::ports::PatternStore;

/// Pattern store backed by a single JSON file.
pub struct JsonFilePatternStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFilePatternStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_collection(&self) -> DomainResult<Vec<GenerationPattern>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(DomainError::Storage(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }

        serde_json::from_str(&raw).map_err(|e| {
            DomainError::SerializationError(format!(
                "Pattern store {} is corrupt: {}",
                self.path.display(),
                e
            ))
        })
    }

    async fn write_collection(&self, patterns: &[GenerationPattern]) -> DomainResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let body = serde_json::to_string_pretty(patterns)?;
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body).await?;
        if let Err(e) = tokio::fs::rename(&tmp_path, &self.path).await {
            warn!(path = %tmp_path.display(), error = %e, "Rename of pattern store failed");
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), count = patterns.len(), "Pattern store written");
        Ok(())
    }
}

#[async_trait]
impl PatternStore for JsonFilePatternStore {
    async fn load_all(&self) -> DomainResult<Vec<GenerationPattern>> {
        self.read_collection().await
    }

    async fn append(&self, pattern: &GenerationPattern) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut patterns = self.read_collection().await?;
        patterns.push(pattern.clone());
        self.write_collection(&patterns).await
    }

    async fn write_all(&self, patterns: &[GenerationPattern]) -> DomainResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_collection(patterns).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn pattern(name: &str) -> GenerationPattern {
        GenerationPattern::new(name, format!("a {name}"), json!({}), "<div/>", true)
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFilePatternStore::new(dir.path().join("nested/patterns.json"));
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_creates_parent_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/patterns.json");
        let store = JsonFilePatternStore::new(&path);

        store.append(&pattern("Hero")).await.unwrap();
        store.append(&pattern("Footer")).await.unwrap();

        let reopened = JsonFilePatternStore::new(&path);
        let loaded = reopened.load_all().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].component_name, "Hero");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonFilePatternStore::new(dir.path().join("patterns.json")));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.append(&pattern(&format!("C{i}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load_all().await.unwrap().len(), 8);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_serialization_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patterns.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = JsonFilePatternStore::new(&path);
        assert!(matches!(
            store.load_all().await,
            Err(DomainError::SerializationError(_))
        ));
    }
}
