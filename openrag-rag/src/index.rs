//! Text-in, documents-out similarity search.

use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Document, Filter};
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// Similarity search over an indexed corpus.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Returns at most `k` documents, most similar first.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>>;
}

/// An embedding provider bound to one vector store collection.
#[derive(Clone)]
pub struct CollectionIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    collection: String,
}

impl CollectionIndex {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        collection: impl Into<String>,
    ) -> Self {
        Self { embedder, store, collection: collection.into() }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorIndex for CollectionIndex {
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;
        let filter = filter.filter(|f| !f.is_empty());
        let results = self.store.search(&self.collection, &embedding, k, filter).await?;

        tracing::debug!(collection = %self.collection, k, hits = results.len(), "similarity search");
        Ok(results.into_iter().map(|result| result.chunk.into_document()).collect())
    }
}
