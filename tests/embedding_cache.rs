//! Embedding cache behavior under concurrency and backend trouble.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pagewright::domain::models::EmbeddingConfig;
use pagewright::domain::ports::HashEmbeddingProvider;
use pagewright::infrastructure::retry::RetryPolicy;
use pagewright::services::{cosine_similarity, EmbeddingCache};
use pagewright::{EmbeddingError, EmbeddingProvider};

/// Slow backend that fails with quota errors while `quota_failures` remain.
struct SlowProvider {
    calls: AtomicUsize,
    quota_failures: AtomicUsize,
}

impl SlowProvider {
    fn new(quota_failures: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            quota_failures: AtomicUsize::new(quota_failures),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for SlowProvider {
    fn name(&self) -> &'static str {
        "slow"
    }

    fn dimension(&self) -> usize {
        8
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let remaining = self.quota_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.quota_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EmbeddingError::QuotaExceeded("429".to_string()));
        }
        Ok(pagewright::domain::ports::hash_embedding(text, 8))
    }
}

fn cache(provider: Arc<SlowProvider>, retry: RetryPolicy) -> EmbeddingCache {
    let config = EmbeddingConfig {
        fallback_dimension: 8,
        ..Default::default()
    };
    EmbeddingCache::new(provider, &config, retry)
}

#[tokio::test]
async fn test_concurrent_requests_share_one_backend_call() {
    let provider = Arc::new(SlowProvider::new(0));
    let cache = cache(provider.clone(), RetryPolicy::new(1, 1, 1, 0));

    let texts = ["Hero Banner", "hero banner", "  HERO BANNER ", "hero banner"];
    let vectors = join_all(texts.iter().map(|t| cache.embed(t))).await;

    assert_eq!(provider.calls(), 1);
    let first = vectors[0].as_ref().unwrap();
    assert!(vectors.iter().all(|v| v.as_ref().unwrap() == first));
    assert_eq!(cache.entry_count().await, 1);

    cache.embed("pricing table").await.unwrap();
    cache.embed("Hero banner").await.unwrap();
    assert_eq!(provider.calls(), 2);
    assert_eq!(cache.entry_count().await, 2);
}

#[tokio::test]
async fn test_quota_errors_retry_then_cache() {
    let provider = Arc::new(SlowProvider::new(2));
    let cache = cache(provider.clone(), RetryPolicy::new(3, 1, 2, 0));

    let vector = cache.embed("navbar").await.unwrap();
    assert_eq!(vector.len(), 8);
    assert_eq!(provider.calls(), 3);
    assert!(cache.contains("NAVBAR").await);
}

#[tokio::test]
async fn test_exhausted_quota_degrades_without_caching() {
    let provider = Arc::new(SlowProvider::new(10));
    let cache = cache(provider.clone(), RetryPolicy::new(2, 1, 1, 0));

    let embedded = cache.embed_or_fallback("footer with links").await;
    assert!(embedded.degraded);
    assert_eq!(embedded.vector.len(), 8);
    assert_eq!(provider.calls(), 2);
    assert!(!cache.contains("footer with links").await);
}

#[tokio::test]
async fn test_similar_requests_rank_above_unrelated_ones() {
    let cache = EmbeddingCache::with_defaults(Arc::new(HashEmbeddingProvider::new(64)));

    let query = cache.embed("hero section with headline and image").await.unwrap();
    let same = cache.embed("Hero section with headline and image").await.unwrap();
    let unrelated = cache.embed("zzz qqq xxyy").await.unwrap();

    assert!((cosine_similarity(&query, &same) - 1.0).abs() < 1e-5);
    assert!(cosine_similarity(&query, &unrelated) < 1.0 - 1e-3);
}

#[test]
fn test_cosine_edge_cases() {
    assert_eq!(cosine_similarity(&[], &[]), 0.0);
    assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0]), 0.0);
    assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    assert!((cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]) + 1.0).abs() < 1e-6);
    assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
}
