//! Embedding cache with in-flight deduplication and rate-limit retries.
//!
//! Keys are the trimmed, lower-cased text. A hit never reaches the backend.
//! Concurrent misses for the same key share one backend call through
//! `moka`'s `try_get_with`; every waiter observes the same outcome. Only
//! successes are cached, so a failed key is retried by the next caller.
//!
//! Each backend call is bounded by a request timeout and wrapped in the
//! [`RetryPolicy`], which retries `QuotaExceeded` only.

use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::models::EmbeddingConfig;
use crate::domain::ports::embedding::{EmbeddingError, EmbeddingProvider};
use crate::domain::ports::hash_embedding;
use crate::infrastructure::retry::RetryPolicy;

/// A vector returned by [`EmbeddingCache::embed_or_fallback`].
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddedText {
    pub vector: Vec<f32>,
    /// True when the backend failed and a hash vector was substituted.
    pub degraded: bool,
}

pub struct EmbeddingCache {
    provider: Arc<dyn EmbeddingProvider>,
    cache: Cache<String, Arc<Vec<f32>>>,
    retry: RetryPolicy,
    request_timeout: Duration,
    fallback_dimension: usize,
}

impl EmbeddingCache {
    pub fn new(provider: Arc<dyn EmbeddingProvider>, config: &EmbeddingConfig, retry: RetryPolicy) -> Self {
        Self {
            provider,
            cache: Cache::builder().max_capacity(config.cache_capacity).build(),
            retry,
            request_timeout: Duration::from_secs(config.timeout_secs),
            fallback_dimension: config.fallback_dimension,
        }
    }

    pub fn with_defaults(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(provider, &EmbeddingConfig::default(), RetryPolicy::default())
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Cache key for a text.
    pub fn normalize_key(text: &str) -> String {
        text.trim().to_lowercase()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Embed `text`, serving from cache when possible.
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_with(text, true).await
    }

    /// Like [`embed`](Self::embed) but with a single backend attempt.
    pub async fn embed_once(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_with(text, false).await
    }

    async fn embed_with(&self, text: &str, retry: bool) -> Result<Vec<f32>, EmbeddingError> {
        let key = Self::normalize_key(text);
        if key.is_empty() {
            return Err(EmbeddingError::EmbeddingBackendError(
                "Cannot embed empty text".to_string(),
            ));
        }

        let vector = self
            .cache
            .try_get_with(key.clone(), async {
                let vector = if retry {
                    self.retry.execute(|| self.call_backend(&key)).await?
                } else {
                    self.call_backend(&key).await?
                };
                Ok::<_, EmbeddingError>(Arc::new(vector))
            })
            .await
            .map_err(|shared| Arc::try_unwrap(shared).unwrap_or_else(|arc| (*arc).clone()))?;

        Ok(vector.as_ref().clone())
    }

    /// Embed `text`, substituting a deterministic hash vector when the
    /// backend fails after retries. Degraded vectors are not cached.
    pub async fn embed_or_fallback(&self, text: &str) -> EmbeddedText {
        match self.embed(text).await {
            Ok(vector) => EmbeddedText {
                vector,
                degraded: false,
            },
            Err(e) => {
                warn!(error = %e, "Embedding backend unavailable, using hash fallback");
                EmbeddedText {
                    vector: hash_embedding(&Self::normalize_key(text), self.fallback_dimension),
                    degraded: true,
                }
            }
        }
    }

    pub async fn contains(&self, text: &str) -> bool {
        self.cache.contains_key(&Self::normalize_key(text))
    }

    /// Number of cached vectors.
    pub async fn entry_count(&self) -> u64 {
        self.cache.run_pending_tasks().await;
        self.cache.entry_count()
    }

    async fn call_backend(&self, key: &str) -> Result<Vec<f32>, EmbeddingError> {
        debug!(provider = self.provider.name(), chars = key.len(), "Embedding cache miss");
        match tokio::time::timeout(self.request_timeout, self.provider.embed(key)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::EmbeddingBackendError(format!(
                "Embedding request timed out after {}ms",
                self.request_timeout.as_millis()
            ))),
        }
    }
}

/// Cosine similarity in [-1, 1]. Zero on dimension mismatch, empty input or
/// a zero-norm vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider that counts calls and fails the first `failures` of them.
    struct CountingProvider {
        calls: AtomicUsize,
        failures: usize,
        error: EmbeddingError,
        delay: Duration,
    }

    impl CountingProvider {
        fn ok() -> Self {
            Self::failing(0, EmbeddingError::QuotaExceeded("429".into()))
        }

        fn failing(failures: usize, error: EmbeddingError) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                error,
                delay: Duration::ZERO,
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn dimension(&self) -> usize {
            3
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if n < self.failures {
                return Err(self.error.clone());
            }
            Ok(vec![text.len() as f32, 1.0, 0.5])
        }
    }

    fn cache_for(provider: Arc<CountingProvider>) -> EmbeddingCache {
        EmbeddingCache::new(provider, &EmbeddingConfig::default(), RetryPolicy::new(5, 1, 4, 0))
    }

    #[tokio::test]
    async fn test_hit_skips_backend() {
        let provider = Arc::new(CountingProvider::ok());
        let cache = cache_for(Arc::clone(&provider));

        let first = cache.embed("Hero Section").await.unwrap();
        let second = cache.embed("  hero section ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.calls(), 1);
        assert!(cache.contains("HERO SECTION").await);
    }

    #[tokio::test]
    async fn test_quota_is_retried() {
        let provider = Arc::new(CountingProvider::failing(
            2,
            EmbeddingError::QuotaExceeded("429".into()),
        ));
        let cache = cache_for(Arc::clone(&provider));

        assert!(cache.embed("text").await.is_ok());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn test_embed_once_does_not_retry() {
        let provider = Arc::new(CountingProvider::failing(
            1,
            EmbeddingError::QuotaExceeded("429".into()),
        ));
        let cache = cache_for(Arc::clone(&provider));

        assert!(cache.embed_once("text").await.is_err());
        assert_eq!(provider.calls(), 1);
        assert!(!cache.contains("text").await);

        assert!(cache.embed_once("text").await.is_ok());
        assert_eq!(provider.calls(), 2);
        assert!(cache.contains("text").await);
    }

    #[tokio::test]
    async fn test_backend_error_not_retried_or_cached() {
        let provider = Arc::new(CountingProvider::failing(
            1,
            EmbeddingError::EmbeddingBackendError("500".into()),
        ));
        let cache = cache_for(Arc::clone(&provider));

        assert!(cache.embed("text").await.is_err());
        assert_eq!(provider.calls(), 1);
        assert!(!cache.contains("text").await);

        assert!(cache.embed("text").await.is_ok());
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_fallback_after_exhaustion() {
        let provider = Arc::new(CountingProvider::failing(
            usize::MAX,
            EmbeddingError::QuotaExceeded("429".into()),
        ));
        let cache = cache_for(Arc::clone(&provider));

        let embedded = cache.embed_or_fallback("pricing table").await;
        assert!(embedded.degraded);
        assert_eq!(embedded.vector.len(), 64);
        assert!(embedded.vector.iter().any(|v| *v != 0.0));
        assert_eq!(provider.calls(), 5);

        let again = cache.embed_or_fallback("Pricing Table").await;
        assert_eq!(again.vector, embedded.vector);
    }

    #[tokio::test]
    async fn test_request_timeout_is_backend_error() {
        let provider = Arc::new(CountingProvider {
            delay: Duration::from_millis(200),
            ..CountingProvider::ok()
        });
        let cache = cache_for(Arc::clone(&provider)).with_request_timeout(Duration::from_millis(20));

        let err = cache.embed("slow").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmbeddingBackendError(_)));
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_text_rejected() {
        let provider = Arc::new(CountingProvider::ok());
        let cache = cache_for(Arc::clone(&provider));
        assert!(cache.embed("   ").await.is_err());
        assert_eq!(provider.calls(), 0);
    }

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }
}
