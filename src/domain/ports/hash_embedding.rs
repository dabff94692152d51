//! Deterministic hash embedding provider.
//!
//! Degraded-mode provider used when the real embedding backend is
//! unavailable or rate limited past its retry budget. Vectors are derived
//! from a stable string hash, so the same text always maps to the same
//! vector across runs. Similarity between hash vectors only reflects shared
//! tokens; it is not a semantic guarantee.

use async_trait::async_trait;

use super::embedding::{EmbeddingError, EmbeddingProvider};

/// Default dimension for fallback vectors.
pub const DEFAULT_HASH_DIMENSION: usize = 64;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a over the UTF-8 bytes. Stable across platforms and releases.
pub fn stable_hash(text: &str) -> u64 {
    text.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Build a normalized bag-of-tokens hash vector. Never returns an empty or
/// all-zero vector for a non-zero dimension.
pub fn hash_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let dimension = dimension.max(1);
    let mut vector = vec![0.0_f32; dimension];

    let normalized = text.trim().to_lowercase();
    let mut tokens = normalized
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .peekable();

    if tokens.peek().is_none() {
        let hash = stable_hash(&normalized);
        vector[(hash % dimension as u64) as usize] = 1.0;
        return vector;
    }

    for token in tokens {
        let hash = stable_hash(token);
        let bucket = (hash % dimension as u64) as usize;
        let sign = if (hash >> 32) & 1 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign;
    }

    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        // Opposite-signed collisions cancelled out.
        let hash = stable_hash(&normalized);
        vector[(hash % dimension as u64) as usize] = 1.0;
        return vector;
    }

    vector.iter_mut().for_each(|v| *v /= norm);
    vector
}

/// Embedding provider that never touches the network.
#[derive(Debug, Clone)]
pub struct HashEmbeddingProvider {
    dimension: usize,
}

impl Default for HashEmbeddingProvider {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_DIMENSION)
    }
}

impl HashEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbeddingProvider {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(hash_embedding(text, self.dimension))
    }
}
