//! Offline feature-hashed bag-of-words embeddings.

use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const DEFAULT_MODEL: &str = "bow-384";

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Lowercased alphanumeric tokens of `text`.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn fnv1a(token: &str) -> u64 {
    token.bytes().fold(FNV_OFFSET, |hash, byte| (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME))
}

/// Counts tokens into `dimensions` buckets and L2-normalizes the result.
///
/// Deterministic across runs and platforms, so indexes built with it can be
/// persisted and reloaded. Useful for tests and air-gapped setups; it has no
/// notion of synonyms.
#[derive(Debug, Clone)]
pub struct HashingEmbedding {
    model: String,
    dimensions: usize,
}

impl HashingEmbedding {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::EmbeddingError {
                provider: "hashing".to_string(),
                message: "dimensions must be greater than zero".to_string(),
            });
        }
        Ok(Self { model: format!("bow-{dimensions}"), dimensions })
    }

    /// Parses a `bow-<dimensions>` model name.
    pub fn from_model(model: &str) -> Result<Self> {
        let dimensions = model
            .strip_prefix("bow-")
            .and_then(|dims| dims.parse::<usize>().ok())
            .ok_or_else(|| RagError::EmbeddingError {
                provider: "hashing".to_string(),
                message: format!("unknown model '{model}', expected bow-<dimensions>"),
            })?;
        Self::new(dimensions)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in tokenize(text) {
            let bucket = (fnv1a(&token) % self.dimensions as u64) as usize;
            vector[bucket] += 1.0;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

impl Default for HashingEmbedding {
    fn default() -> Self {
        Self { model: DEFAULT_MODEL.to_string(), dimensions: 384 }
    }
}

#[async_trait]
impl EmbeddingProvider for HashingEmbedding {
    fn name(&self) -> &str {
        "hashing"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
}
