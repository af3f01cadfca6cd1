//! Embeddings from the Hugging Face inference API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const DEFAULT_MODEL: &str = "Alibaba-NLP/gte-large-en-v1.5";
pub const HF_INFERENCE_BASE: &str = "https://router.huggingface.co/hf-inference";

/// Reads `HF_TOKEN`, falling back to `HUGGINGFACEHUB_API_TOKEN`.
pub fn api_key_from_env() -> Option<String> {
    ["HF_TOKEN", "HUGGINGFACEHUB_API_TOKEN"]
        .into_iter()
        .find_map(|var| std::env::var(var).ok().filter(|value| !value.is_empty()))
}

/// Feature-extraction output: sentence vectors, or token vectors for models
/// without a pooling head.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FeatureOutput {
    Pooled(Vec<Vec<f32>>),
    Tokens(Vec<Vec<Vec<f32>>>),
}

fn mean_pool(tokens: Vec<Vec<f32>>) -> Vec<f32> {
    let Some(width) = tokens.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut pooled = vec![0.0f32; width];
    for token in &tokens {
        for (sum, value) in pooled.iter_mut().zip(token) {
            *sum += value;
        }
    }
    let count = tokens.len() as f32;
    pooled.iter_mut().for_each(|value| *value /= count);
    pooled
}

/// Calls `POST {base}/models/{model}/pipeline/feature-extraction`.
pub struct HuggingFaceEmbedding {
    client: reqwest::Client,
    model: String,
    base_url: String,
    api_key: Option<String>,
}

impl HuggingFaceEmbedding {
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| RagError::EmbeddingError {
            provider: "huggingface".to_string(),
            message: format!("failed to create HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            model: model.into(),
            base_url: HF_INFERENCE_BASE.to_string(),
            api_key: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn err(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: "huggingface".to_string(), message: message.into() }
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}/pipeline/feature-extraction",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceEmbedding {
    fn name(&self) -> &str {
        "huggingface"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Self::err("empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut request = self.client.post(self.url()).json(&json!({ "inputs": texts }));
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| Self::err(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| Self::err(format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(Self::err(format!("API error ({status}): {body}")));
        }

        let output: FeatureOutput =
            serde_json::from_str(&body).map_err(|e| Self::err(format!("invalid response: {e}")))?;
        let embeddings = match output {
            FeatureOutput::Pooled(vectors) => vectors,
            FeatureOutput::Tokens(per_text) => per_text.into_iter().map(mean_pool).collect(),
        };
        if embeddings.len() != texts.len() {
            return Err(Self::err(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                embeddings.len()
            )));
        }

        tracing::debug!(model = %self.model, count = texts.len(), "embedded batch with huggingface");
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_pool_averages_token_vectors() {
        assert_eq!(mean_pool(vec![vec![1.0, 3.0], vec![3.0, 5.0]]), vec![2.0, 4.0]);
        assert!(mean_pool(Vec::new()).is_empty());
    }

    #[test]
    fn url_includes_model_path() {
        let embedder = HuggingFaceEmbedding::new("BAAI/bge-small-en-v1.5")
            .unwrap()
            .with_base_url("http://localhost:9000/");
        assert_eq!(
            embedder.url(),
            "http://localhost:9000/models/BAAI/bge-small-en-v1.5/pipeline/feature-extraction"
        );
    }
}
