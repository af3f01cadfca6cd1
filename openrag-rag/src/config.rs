//! Configuration for indexing and retrieval.
//!
//! [`RagConfig`] is read from TOML ([`RagConfig::from_file`],
//! [`RagConfig::from_toml_str`]) or assembled with [`RagConfig::builder`].
//! Every entry point validates before returning, so a config in hand is
//! always usable.

use std::path::{Path, PathBuf};
use std::time::Duration;

use openrag_core::{GenerateContentConfig, PromptTemplate};
use openrag_model::RetryConfig;
use serde::{Deserialize, Serialize};

use crate::chunking::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::error::{RagError, Result};
use crate::vectorstore::validate_collection_name;

pub const DEFAULT_REPHRASING_PROMPT: &str = "\
Please rephrase the following query into four different but related queries.
Ensure each query is distinct in terms of phrasing, focus, or specificity.
Act: {query}
output : Format all responses as JSON objects as shown in the examples above. Should be in this format
{format_instructions}
";

pub const DEFAULT_CLASSIFIER_PROMPT: &str = "\
Can this content:
    content: {content}
be used to answer this question?
    question: {question}
answer True if the content can be used to answer the question, false otherwise
output : Format all responses as JSON objects in this format
{format_instructions}
";

/// Prompt templates for the model-backed retrieval stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Placeholders: `{query}`, `{format_instructions}`.
    pub rephrasing: String,
    /// Placeholders: `{question}`, `{content}`, `{format_instructions}`.
    pub classifier: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            rephrasing: DEFAULT_REPHRASING_PROMPT.to_string(),
            classifier: DEFAULT_CLASSIFIER_PROMPT.to_string(),
        }
    }
}

impl PromptConfig {
    pub fn rephrasing_template(&self) -> Result<PromptTemplate> {
        PromptTemplate::with_required(&self.rephrasing, &["query", "format_instructions"])
            .map_err(|e| RagError::Config(format!("prompts.rephrasing: {e}")))
    }

    pub fn classifier_template(&self) -> Result<PromptTemplate> {
        PromptTemplate::with_required(&self.classifier, &["question", "content", "format_instructions"])
            .map_err(|e| RagError::Config(format!("prompts.classifier: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        self.rephrasing_template()?;
        self.classifier_template()?;
        Ok(())
    }
}

/// Result counts for the retrieval strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results of naive retrieval.
    pub top_k: usize,
    /// Candidates fetched before re-ranking or classification.
    pub search_k: usize,
    /// Results returned after re-ranking.
    pub output_k: usize,
    /// Classification calls in flight at once.
    pub classification_concurrency: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 5, search_k: 15, output_k: 5, classification_concurrency: 1 }
    }
}

impl RetrievalConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_k == 0 {
            return Err(RagError::Config("retrieval.output_k must be greater than zero".to_string()));
        }
        if self.search_k < self.output_k {
            return Err(RagError::Config(format!(
                "retrieval.search_k ({}) must be at least output_k ({})",
                self.search_k, self.output_k
            )));
        }
        if self.classification_concurrency == 0 {
            return Err(RagError::Config(
                "retrieval.classification_concurrency must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { provider: "huggingface".to_string(), model: None, base_url: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub backend: String,
    pub collection: String,
    /// Persistence directory.
    pub path: Option<PathBuf>,
    /// Remote endpoint for server-backed stores.
    pub url: Option<String>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self { backend: "memory".to_string(), collection: "documents".to_string(), path: None, url: None }
    }
}

/// Chat model used by the rephrasing and classification strategies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Per-attempt limit; `None` waits indefinitely.
    pub attempt_timeout_secs: Option<u64>,
    /// Sampling overrides; unset values keep the provider's defaults.
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<i32>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            base_url: None,
            max_retries: 2,
            initial_delay_ms: 250,
            max_delay_ms: 2000,
            attempt_timeout_secs: Some(60),
            temperature: None,
            top_p: None,
            max_output_tokens: None,
        }
    }
}

impl LlmConfig {
    /// Retry policy for structured model calls.
    pub fn retry_config(&self) -> RetryConfig {
        let retry = RetryConfig::default()
            .with_max_retries(self.max_retries)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms));
        match self.attempt_timeout_secs {
            Some(secs) => retry.with_attempt_timeout(Duration::from_secs(secs)),
            None => retry,
        }
    }

    /// Sampling settings for rephrasing and classification requests.
    pub fn generation_config(&self) -> GenerateContentConfig {
        GenerateContentConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            max_output_tokens: self.max_output_tokens,
            response_schema: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankerConfig {
    pub name: String,
    pub model: Option<String>,
}

impl Default for RerankerConfig {
    fn default() -> Self {
        Self { name: "term-overlap".to_string(), model: None }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub splitter: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub embedding: EmbeddingConfig,
    pub vector_store: VectorStoreConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub reranker: RerankerConfig,
    pub prompts: PromptConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            splitter: "recursive".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            embedding: EmbeddingConfig::default(),
            vector_store: VectorStoreConfig::default(),
            retrieval: RetrievalConfig::default(),
            llm: LlmConfig::default(),
            reranker: RerankerConfig::default(),
            prompts: PromptConfig::default(),
        }
    }
}

impl RagConfig {
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(input).map_err(|e| RagError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path)
            .map_err(|e| RagError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&input)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| RagError::Config(format!("cannot serialize: {e}")))
    }

    /// Checks sizes, counts and prompt placeholders.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if let Err(RagError::Config(reason)) = validate_collection_name(&self.vector_store.collection) {
            return Err(RagError::Config(format!("vector_store.collection: {reason}")));
        }
        self.retrieval.validate()?;
        self.prompts.validate()
    }
}

/// Builder for [`RagConfig`]; unset fields keep their defaults.
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    pub fn splitter(mut self, splitter: impl Into<String>) -> Self {
        self.config.splitter = splitter.into();
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.config.chunk_size = chunk_size;
        self
    }

    pub fn chunk_overlap(mut self, chunk_overlap: usize) -> Self {
        self.config.chunk_overlap = chunk_overlap;
        self
    }

    pub fn embedding(mut self, provider: impl Into<String>, model: Option<String>) -> Self {
        self.config.embedding.provider = provider.into();
        self.config.embedding.model = model;
        self
    }

    pub fn vector_store(mut self, backend: impl Into<String>, collection: impl Into<String>) -> Self {
        self.config.vector_store.backend = backend.into();
        self.config.vector_store.collection = collection.into();
        self
    }

    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.vector_store.path = Some(path.into());
        self
    }

    pub fn retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.config.retrieval = retrieval;
        self
    }

    pub fn llm(mut self, llm: LlmConfig) -> Self {
        self.config.llm = llm;
        self
    }

    pub fn reranker(mut self, name: impl Into<String>) -> Self {
        self.config.reranker.name = name.into();
        self
    }

    pub fn prompts(mut self, prompts: PromptConfig) -> Self {
        self.config.prompts = prompts;
        self
    }

    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
