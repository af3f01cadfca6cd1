//! Wiring from a [`RagConfig`] to a ready pipeline and retriever.

use std::sync::Arc;

use openrag_core::Llm;
use openrag_model::{LlmSettings, resolve_llm_with};

use crate::chunking::{ChunkerKind, resolve_chunker};
use crate::classifier::RelevanceClassifier;
use crate::config::RagConfig;
use crate::embedding::{EmbeddingSettings, resolve_embedding_provider_with};
use crate::error::Result;
use crate::loader::DocumentLoader;
use crate::pipeline::RagPipeline;
use crate::rephraser::QueryRephraser;
use crate::reranker::resolve_reranker;
use crate::retriever::Retriever;
use crate::vectorstore::{VectorStoreSettings, resolve_vector_store};

/// An ingestion pipeline and a retriever sharing one collection.
///
/// Every backend is resolved once, here; unknown names fail before any
/// document is read.
pub struct RagSystem {
    config: RagConfig,
    pipeline: RagPipeline,
    retriever: Retriever,
}

impl RagSystem {
    /// Resolves every backend named in `config`, including the chat model.
    pub async fn from_config(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let llm = resolve_llm_with(
            &config.llm.provider,
            LlmSettings {
                model: config.llm.model.clone(),
                base_url: config.llm.base_url.clone(),
                retry: None,
            },
        )?;
        Self::with_llm(config, llm).await
    }

    /// Like [`RagSystem::from_config`] but with a caller-supplied chat model.
    pub async fn with_llm(config: RagConfig, llm: Arc<dyn Llm>) -> Result<Self> {
        config.validate()?;

        let embedder = resolve_embedding_provider_with(
            &config.embedding.provider,
            EmbeddingSettings {
                model: config.embedding.model.clone(),
                base_url: config.embedding.base_url.clone(),
                api_key: None,
            },
        )?;
        let store = resolve_vector_store(
            &config.vector_store.backend,
            VectorStoreSettings {
                path: config.vector_store.path.clone(),
                url: config.vector_store.url.clone(),
            },
        )
        .await?;
        let chunker = resolve_chunker(&config.splitter, config.chunk_size, config.chunk_overlap)?;
        let reranker = resolve_reranker(&config.reranker.name, config.reranker.model.as_deref())?;

        let pipeline = RagPipeline::builder()
            .embedding_provider(embedder)
            .vector_store(store)
            .chunker(chunker)
            .collection(config.vector_store.collection.clone())
            .build()?;

        let retry = config.llm.retry_config();
        let generation = config.llm.generation_config();
        let rephraser = QueryRephraser::new(Arc::clone(&llm), &config.prompts)?
            .with_retry_config(retry.clone())
            .with_generation_config(generation.clone());
        let classifier = RelevanceClassifier::new(llm, &config.prompts)?
            .with_retry_config(retry)
            .with_generation_config(generation);

        let retriever = Retriever::new(Arc::new(pipeline.index()))
            .with_reranker(reranker)
            .with_rephraser(Arc::new(rephraser))
            .with_classifier(Arc::new(classifier))
            .with_config(config.retrieval);

        tracing::info!(
            embedding = %config.embedding.provider,
            store = %config.vector_store.backend,
            collection = %config.vector_store.collection,
            reranker = %config.reranker.name,
            "rag system ready"
        );
        Ok(Self { config, pipeline, retriever })
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &RagPipeline {
        &self.pipeline
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// A loader whose output suits the configured splitter: the HTML
    /// heading splitter needs the markup kept.
    pub fn loader(&self) -> DocumentLoader {
        let keep_html = matches!(self.config.splitter.parse::<ChunkerKind>(), Ok(ChunkerKind::HtmlHeader));
        DocumentLoader::new().keep_html(keep_html)
    }

    /// Flushes the vector store, for backends that persist explicitly.
    pub async fn persist(&self) -> Result<()> {
        self.pipeline.store().persist().await
    }
}
