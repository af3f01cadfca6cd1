//! Local ONNX embeddings through the `fastembed` crate.

use std::sync::{Arc, Mutex};

use ::fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use async_trait::async_trait;

use super::EmbeddingProvider;
use crate::error::{RagError, Result};

fn err(message: impl Into<String>) -> RagError {
    RagError::EmbeddingError { provider: "fastembed".to_string(), message: message.into() }
}

fn model_for(name: &str) -> Result<EmbeddingModel> {
    match name {
        "BAAI/bge-large-en-v1.5" => Ok(EmbeddingModel::BGELargeENV15),
        "BAAI/bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        "BAAI/bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "sentence-transformers/all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "nomic-ai/nomic-embed-text-v1.5" => Ok(EmbeddingModel::NomicEmbedTextV15),
        other => Err(err(format!("unknown fastembed model '{other}'"))),
    }
}

/// Runs a fastembed model on the blocking thread pool.
///
/// The model is loaded (and downloaded on first use) at construction.
pub struct FastEmbedProvider {
    model_name: String,
    model: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedProvider {
    pub fn new(model_name: &str) -> Result<Self> {
        let options = InitOptions::new(model_for(model_name)?).with_show_download_progress(false);
        let model = TextEmbedding::try_new(options)
            .map_err(|e| err(format!("failed to load '{model_name}': {e}")))?;
        Ok(Self { model_name: model_name.to_string(), model: Arc::new(Mutex::new(model)) })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    fn name(&self) -> &str {
        "fastembed"
    }

    fn model(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text]).await?.into_iter().next().ok_or_else(|| err("no embedding returned"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let owned: Vec<String> = texts.iter().map(|text| text.to_string()).collect();
        tokio::task::spawn_blocking(move || {
            let mut guard = model.lock().map_err(|_| err("model lock poisoned"))?;
            guard.embed(owned, None).map_err(|e| err(e.to_string()))
        })
        .await
        .map_err(|e| err(format!("embedding task failed: {e}")))?
    }
}
