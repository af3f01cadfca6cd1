//! Embedding providers and the registry that builds them by name.
//!
//! | Provider      | Default model                   | Backend                          |
//! |---------------|---------------------------------|----------------------------------|
//! | `huggingface` | `Alibaba-NLP/gte-large-en-v1.5` | HF inference feature-extraction  |
//! | `ollama`      | `llama2`                        | Ollama `/api/embed`              |
//! | `fastembed`   | `BAAI/bge-large-en-v1.5`        | local ONNX (`fastembed` feature) |
//! | `hashing`     | `bow-384`                       | local feature-hashed bag of words |

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::{RagError, Result};

#[cfg(feature = "fastembed")]
pub mod fastembed;
pub mod hashing;
pub mod huggingface;
pub mod ollama;

#[cfg(feature = "fastembed")]
pub use self::fastembed::FastEmbedProvider;
pub use hashing::HashingEmbedding;
pub use huggingface::HuggingFaceEmbedding;
pub use ollama::OllamaEmbedding;

/// Turns text into dense vectors.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Registry name of the provider, e.g. `"ollama"`.
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds several texts, one vector per input in input order.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }
}

/// Known embedding backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmbeddingProviderKind {
    HuggingFace,
    Ollama,
    FastEmbed,
    Hashing,
}

impl EmbeddingProviderKind {
    pub const ALL: [EmbeddingProviderKind; 4] = [
        EmbeddingProviderKind::HuggingFace,
        EmbeddingProviderKind::Ollama,
        EmbeddingProviderKind::FastEmbed,
        EmbeddingProviderKind::Hashing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HuggingFace => "huggingface",
            Self::Ollama => "ollama",
            Self::FastEmbed => "fastembed",
            Self::Hashing => "hashing",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Self::HuggingFace => huggingface::DEFAULT_MODEL,
            Self::Ollama => ollama::DEFAULT_MODEL,
            Self::FastEmbed => "BAAI/bge-large-en-v1.5",
            Self::Hashing => hashing::DEFAULT_MODEL,
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EmbeddingProviderKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RagError::unsupported("Embedding provider", s, &Self::names()))
    }
}

/// Connection details for the HTTP-backed providers.
#[derive(Debug, Clone, Default)]
pub struct EmbeddingSettings {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

/// Builds the provider registered under `provider`, using its default model
/// when `model` is `None`.
pub fn resolve_embedding_provider(
    provider: &str,
    model: Option<&str>,
) -> Result<Arc<dyn EmbeddingProvider>> {
    resolve_embedding_provider_with(
        provider,
        EmbeddingSettings { model: model.map(str::to_string), ..Default::default() },
    )
}

pub fn resolve_embedding_provider_with(
    provider: &str,
    settings: EmbeddingSettings,
) -> Result<Arc<dyn EmbeddingProvider>> {
    let kind: EmbeddingProviderKind = provider.parse()?;
    let model = settings.model.clone().unwrap_or_else(|| kind.default_model().to_string());
    tracing::debug!(provider = %kind, model = %model, "resolving embedding provider");

    match kind {
        EmbeddingProviderKind::HuggingFace => {
            let mut embedder = HuggingFaceEmbedding::new(model)?;
            if let Some(base_url) = settings.base_url {
                embedder = embedder.with_base_url(base_url);
            }
            if let Some(api_key) = settings.api_key.or_else(huggingface::api_key_from_env) {
                embedder = embedder.with_api_key(api_key);
            }
            Ok(Arc::new(embedder))
        }
        EmbeddingProviderKind::Ollama => {
            let mut embedder = OllamaEmbedding::new(model)?;
            if let Some(base_url) = settings.base_url {
                embedder = embedder.with_base_url(base_url);
            }
            Ok(Arc::new(embedder))
        }
        EmbeddingProviderKind::Hashing => Ok(Arc::new(HashingEmbedding::from_model(&model)?)),
        #[cfg(feature = "fastembed")]
        EmbeddingProviderKind::FastEmbed => Ok(Arc::new(FastEmbedProvider::new(&model)?)),
        #[cfg(not(feature = "fastembed"))]
        EmbeddingProviderKind::FastEmbed => Err(RagError::FeatureDisabled {
            kind: "Embedding provider",
            name: kind.as_str().to_string(),
            feature: "fastembed",
        }),
    }
}
