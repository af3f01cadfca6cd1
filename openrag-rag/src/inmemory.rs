//! In-memory vector store with optional JSON persistence.
//!
//! Search is an exhaustive cosine scan, which is fine up to tens of
//! thousands of chunks. Each collection persists to `<dir>/<collection>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::{Chunk, Filter, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::{VectorStore, validate_collection_name};

#[derive(Debug, Clone, Default)]
struct Collection {
    dimensions: usize,
    /// Insertion order; upserts replace in place.
    chunks: Vec<Chunk>,
    /// Chunk id to its index in `chunks`.
    positions: HashMap<String, usize>,
}

impl Collection {
    fn new(dimensions: usize) -> Self {
        Self { dimensions, ..Default::default() }
    }

    fn from_chunks(dimensions: usize, chunks: Vec<Chunk>) -> Self {
        let mut collection = Self::new(dimensions);
        for chunk in chunks {
            collection.upsert(chunk);
        }
        collection
    }

    fn upsert(&mut self, chunk: Chunk) {
        match self.positions.get(&chunk.id) {
            Some(&position) => self.chunks[position] = chunk,
            None => {
                self.positions.insert(chunk.id.clone(), self.chunks.len());
                self.chunks.push(chunk);
            }
        }
    }

    fn remove(&mut self, ids: &[&str]) {
        let before = self.chunks.len();
        self.chunks.retain(|chunk| !ids.contains(&chunk.id.as_str()));
        if self.chunks.len() != before {
            self.positions =
                self.chunks.iter().enumerate().map(|(i, chunk)| (chunk.id.clone(), i)).collect();
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCollection {
    name: String,
    dimensions: usize,
    chunks: Vec<Chunk>,
}

/// Cosine similarity, `0.0` when either vector is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 { 0.0 } else { dot / (norm_a * norm_b) }
}

fn store_err(message: impl Into<String>) -> RagError {
    RagError::VectorStoreError { backend: "memory".to_string(), message: message.into() }
}

fn collection_file(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_collection_name(name).map_err(|e| store_err(e.to_string()))?;
    Ok(dir.join(format!("{name}.json")))
}

/// A [`VectorStore`] held in process memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: RwLock<HashMap<String, Collection>>,
    persist_dir: Option<PathBuf>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store bound to `dir`: collections saved there are loaded now and
    /// [`VectorStore::persist`] writes back to it.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let store = Self { collections: RwLock::new(HashMap::new()), persist_dir: Some(dir.clone()) };
        if tokio::fs::try_exists(&dir).await? {
            store.load(&dir).await?;
        }
        Ok(store)
    }

    /// Writes every collection to `<dir>/<collection>.json`.
    pub async fn save(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await?;

        let collections = self.collections.read().await;
        for (name, collection) in collections.iter() {
            let persisted = PersistedCollection {
                name: name.clone(),
                dimensions: collection.dimensions,
                chunks: collection.chunks.clone(),
            };
            let path = collection_file(dir, name)?;
            tokio::fs::write(&path, serde_json::to_vec(&persisted)?).await?;
            debug!(collection = %name, path = %path.display(), count = collection.chunks.len(), "saved collection");
        }
        Ok(())
    }

    /// Loads every `*.json` collection file in `dir`, replacing collections
    /// with the same name.
    pub async fn load(&self, dir: impl AsRef<Path>) -> Result<()> {
        let mut entries = tokio::fs::read_dir(dir.as_ref()).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut collections = self.collections.write().await;
        for path in paths {
            let bytes = tokio::fs::read(&path).await?;
            let persisted: PersistedCollection = serde_json::from_slice(&bytes)
                .map_err(|e| store_err(format!("corrupt collection file {}: {e}", path.display())))?;
            debug!(collection = %persisted.name, count = persisted.chunks.len(), "loaded collection");
            collections.insert(
                persisted.name,
                Collection::from_chunks(persisted.dimensions, persisted.chunks),
            );
        }
        Ok(())
    }

    pub async fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections.read().await.get(collection).map_or(0, |c| c.chunks.len())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let mut collections = self.collections.write().await;
        collections
            .entry(name.to_string())
            .or_insert_with(|| Collection::new(dimensions));
        debug!(collection = name, dimensions, "created in-memory collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.collections.write().await.remove(name);
        if let Some(dir) = &self.persist_dir {
            let path = collection_file(dir, name)?;
            if tokio::fs::try_exists(&path).await? {
                tokio::fs::remove_file(&path).await?;
            }
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| store_err(format!("collection '{collection}' does not exist")))?;

        for chunk in chunks {
            if chunk.embedding.len() != stored.dimensions {
                return Err(store_err(format!(
                    "chunk '{}' has {} dimensions, collection '{collection}' expects {}",
                    chunk.id,
                    chunk.embedding.len(),
                    stored.dimensions
                )));
            }
        }

        for chunk in chunks {
            stored.upsert(chunk.clone());
        }
        debug!(collection, count = chunks.len(), "upserted chunks");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let mut collections = self.collections.write().await;
        if let Some(stored) = collections.get_mut(collection) {
            stored.remove(ids);
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>> {
        let collections = self.collections.read().await;
        let stored = collections
            .get(collection)
            .ok_or_else(|| store_err(format!("collection '{collection}' does not exist")))?;
        if embedding.len() != stored.dimensions {
            return Err(store_err(format!(
                "query has {} dimensions, collection '{collection}' expects {}",
                embedding.len(),
                stored.dimensions
            )));
        }

        let mut scored: Vec<SearchResult> = stored
            .chunks
            .iter()
            .filter(|chunk| filter.is_none_or(|f| f.matches(&chunk.metadata)))
            .map(|chunk| SearchResult {
                chunk: chunk.clone(),
                score: cosine_similarity(embedding, &chunk.embedding),
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }

    async fn persist(&self) -> Result<()> {
        match &self.persist_dir {
            Some(dir) => self.save(dir).await,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>, lang: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: format!("text of {id}"),
            embedding,
            metadata: HashMap::from([("lang".to_string(), lang.to_string())]),
            document_id: "doc".to_string(),
        }
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_orders_by_score_then_insertion() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[
                    chunk("tie_first", vec![0.0, 1.0], "en"),
                    chunk("best", vec![1.0, 0.0], "en"),
                    chunk("tie_second", vec![0.0, 1.0], "en"),
                ],
            )
            .await
            .unwrap();

        let results = store.search("docs", &[1.0, 0.0], 3, None).await.unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["best", "tie_first", "tie_second"]);
    }

    #[tokio::test]
    async fn search_applies_filter_and_top_k() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store
            .upsert(
                "docs",
                &[
                    chunk("en1", vec![1.0, 0.0], "en"),
                    chunk("fr1", vec![1.0, 0.1], "fr"),
                    chunk("en2", vec![0.5, 0.5], "en"),
                ],
            )
            .await
            .unwrap();

        let filter = Filter::new().eq("lang", "en");
        let results = store.search("docs", &[1.0, 0.0], 10, Some(&filter)).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.chunk.metadata["lang"] == "en"));

        let results = store.search("docs", &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place_and_delete_removes() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        store.upsert("docs", &[chunk("a", vec![1.0, 0.0], "en")]).await.unwrap();
        store.upsert("docs", &[chunk("a", vec![0.0, 1.0], "fr")]).await.unwrap();
        assert_eq!(store.len("docs").await, 1);

        let results = store.search("docs", &[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(results[0].chunk.metadata["lang"], "fr");

        store.delete("docs", &["a"]).await.unwrap();
        assert_eq!(store.len("docs").await, 0);
    }

    #[tokio::test]
    async fn upserts_after_delete_keep_ids_unique() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 2).await.unwrap();
        let batch: Vec<Chunk> =
            (0..5).map(|i| chunk(&format!("c{i}"), vec![1.0, i as f32], "en")).collect();
        store.upsert("docs", &batch).await.unwrap();
        store.delete("docs", &["c1", "c3"]).await.unwrap();
        store
            .upsert("docs", &[chunk("c4", vec![0.0, 1.0], "fr"), chunk("c1", vec![1.0, 0.0], "de")])
            .await
            .unwrap();

        assert_eq!(store.len("docs").await, 4);
        let results = store.search("docs", &[0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(results[0].chunk.id, "c4");
        assert_eq!(results[0].chunk.metadata["lang"], "fr");
        let ids: Vec<String> =
            store.search("docs", &[1.0, 0.0], 10, None).await.unwrap().into_iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids.iter().filter(|id| id.as_str() == "c1").count(), 1);
    }

    #[tokio::test]
    async fn collection_names_cannot_escape_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = InMemoryVectorStore::open(dir.path().join("index")).await.unwrap();
        store.create_collection("../escaped", 2).await.unwrap();

        let err = store.persist().await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }), "{err}");
        assert!(!dir.path().join("escaped.json").exists());
    }

    #[tokio::test]
    async fn dimension_mismatch_is_rejected() {
        let store = InMemoryVectorStore::new();
        store.create_collection("docs", 3).await.unwrap();
        let err = store.upsert("docs", &[chunk("a", vec![1.0], "en")]).await.unwrap_err();
        assert!(matches!(err, RagError::VectorStoreError { .. }));
        assert!(store.search("docs", &[1.0], 1, None).await.is_err());
    }

    #[tokio::test]
    async fn missing_collection_is_an_error() {
        let store = InMemoryVectorStore::new();
        assert!(store.search("nope", &[1.0], 1, None).await.is_err());
    }

    #[tokio::test]
    async fn persists_and_reloads_collections() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = InMemoryVectorStore::open(dir.path()).await.unwrap();
            store.create_collection("docs", 2).await.unwrap();
            store.upsert("docs", &[chunk("a", vec![1.0, 0.0], "en")]).await.unwrap();
            store.persist().await.unwrap();
        }
        assert!(dir.path().join("docs.json").exists());

        let reopened = InMemoryVectorStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.collection_names().await, vec!["docs".to_string()]);
        let results = reopened.search("docs", &[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results[0].chunk.id, "a");
        assert_eq!(results[0].chunk.metadata["lang"], "en");
    }
}
