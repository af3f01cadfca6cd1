//! Ingestion: chunk, embed and store documents.

use std::sync::Arc;

use openrag_telemetry::{Instrument, ingest_span, record_chunk_count};
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::chunking::{Chunker, RecursiveChunker, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::CollectionIndex;
use crate::inmemory::InMemoryVectorStore;
use crate::vectorstore::VectorStore;

pub const DEFAULT_EMBED_BATCH_SIZE: usize = 32;

/// Writes documents into one collection of a vector store.
///
/// The collection is created on the first non-empty ingest, sized to the
/// dimension of the first embedding.
pub struct RagPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    chunker: Arc<dyn Chunker>,
    collection: String,
    batch_size: usize,
    created: OnceCell<usize>,
}

impl RagPipeline {
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn store(&self) -> Arc<dyn VectorStore> {
        Arc::clone(&self.store)
    }

    /// A search view over the pipeline's collection.
    pub fn index(&self) -> CollectionIndex {
        CollectionIndex::new(Arc::clone(&self.embedder), Arc::clone(&self.store), &self.collection)
    }

    /// Chunks, embeds and upserts `documents`, returning the stored chunks.
    pub async fn ingest(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let span = ingest_span(&self.collection);
        self.ingest_inner(documents).instrument(span).await
    }

    async fn ingest_inner(&self, documents: &[Document]) -> Result<Vec<Chunk>> {
        let mut chunks: Vec<Chunk> =
            documents.iter().flat_map(|document| self.chunker.chunk(document)).collect();
        if chunks.is_empty() {
            debug!("nothing to ingest");
            return Ok(chunks);
        }

        for batch in chunks.chunks_mut(self.batch_size) {
            let texts: Vec<&str> = batch.iter().map(|chunk| chunk.text.as_str()).collect();
            let embeddings = self.embedder.embed_batch(&texts).await?;
            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingError {
                    provider: self.embedder.name().to_string(),
                    message: format!("expected {} embeddings, got {}", batch.len(), embeddings.len()),
                });
            }
            for (chunk, embedding) in batch.iter_mut().zip(embeddings) {
                chunk.embedding = embedding;
            }
        }

        let dimensions = chunks[0].embedding.len();
        self.ensure_collection(dimensions).await?;
        self.store.upsert(&self.collection, &chunks).await?;

        record_chunk_count(chunks.len());
        info!(
            collection = %self.collection,
            documents = documents.len(),
            chunks = chunks.len(),
            "ingested documents"
        );
        Ok(chunks)
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let expected = *self
            .created
            .get_or_try_init(|| async {
                self.store.create_collection(&self.collection, dimensions).await?;
                Ok::<usize, RagError>(dimensions)
            })
            .await?;
        if expected != dimensions {
            return Err(RagError::EmbeddingError {
                provider: self.embedder.name().to_string(),
                message: format!(
                    "embedding dimension changed from {expected} to {dimensions} in collection '{}'",
                    self.collection
                ),
            });
        }
        Ok(())
    }
}

/// Builder for [`RagPipeline`]. An embedder is required; the store defaults
/// to an empty [`InMemoryVectorStore`] and the chunker to a
/// [`RecursiveChunker`] with the default sizes.
#[derive(Default)]
pub struct RagPipelineBuilder {
    embedder: Option<Arc<dyn EmbeddingProvider>>,
    store: Option<Arc<dyn VectorStore>>,
    chunker: Option<Arc<dyn Chunker>>,
    collection: Option<String>,
    batch_size: Option<usize>,
}

impl RagPipelineBuilder {
    pub fn embedding_provider(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    pub fn collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    pub fn build(self) -> Result<RagPipeline> {
        let embedder = self
            .embedder
            .ok_or_else(|| RagError::Config("pipeline requires an embedding provider".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(RecursiveChunker::new(DEFAULT_CHUNK_SIZE, DEFAULT_CHUNK_OVERLAP)?),
        };
        let batch_size = self.batch_size.unwrap_or(DEFAULT_EMBED_BATCH_SIZE);
        if batch_size == 0 {
            return Err(RagError::Config("batch_size must be greater than zero".to_string()));
        }

        Ok(RagPipeline {
            embedder,
            store: self.store.unwrap_or_else(|| Arc::new(InMemoryVectorStore::new())),
            chunker,
            collection: self.collection.unwrap_or_else(|| "documents".to_string()),
            batch_size,
            created: OnceCell::new(),
        })
    }
}
