//! Embeddings from a local Ollama server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::error::{RagError, Result};

pub const DEFAULT_MODEL: &str = "llama2";

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
    #[serde(default)]
    error: Option<String>,
}

/// Calls Ollama's `/api/embed` endpoint, one request per batch.
pub struct OllamaEmbedding {
    client: reqwest::Client,
    model: String,
    base_url: String,
}

impl OllamaEmbedding {
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder().build().map_err(|e| RagError::EmbeddingError {
            provider: "ollama".to_string(),
            message: format!("failed to create HTTP client: {e}"),
        })?;
        Ok(Self {
            client,
            model: model.into(),
            base_url: openrag_model::ollama::OLLAMA_API_BASE.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn err(message: impl Into<String>) -> RagError {
        RagError::EmbeddingError { provider: "ollama".to_string(), message: message.into() }
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedding {
    fn name(&self) -> &str {
        "ollama"
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

        let url = format!("{}/api/embed", self.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest { model: &self.model, input: texts })
            .send()
            .await
            .map_err(|e| Self::err(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| Self::err(format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(Self::err(format!("API error ({status}): {body}")));
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&body).map_err(|e| Self::err(format!("invalid response: {e}")))?;
        if let Some(error) = parsed.error {
            return Err(Self::err(error));
        }
        if parsed.embeddings.len() != texts.len() {
            return Err(Self::err(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }

        tracing::debug!(model = %self.model, count = texts.len(), "embedded batch with ollama");
        Ok(parsed.embeddings)
    }
}
