//! The vector store abstraction and backend registry.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;

use crate::document::{Chunk, Filter, SearchResult};
use crate::error::{RagError, Result};
use crate::inmemory::InMemoryVectorStore;

/// Storage for embedded chunks, grouped into named collections.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Creates `name` for vectors of `dimensions`. Creating an existing
    /// collection is a no-op.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Inserts chunks, replacing any stored chunk with the same id.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()>;

    /// Returns at most `top_k` chunks matching `filter`, most similar first.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>>;

    /// Flushes state to durable storage, where the backend has any.
    async fn persist(&self) -> Result<()> {
        Ok(())
    }
}

/// Checks that `name` can double as a file name inside a store directory.
pub fn validate_collection_name(name: &str) -> Result<()> {
    let reason = if name.trim().is_empty() {
        Some("cannot be empty")
    } else if name == "." || name == ".." {
        Some("cannot be a relative directory")
    } else if name.chars().any(|c| matches!(c, '/' | '\\' | ':' | '\0')) {
        Some("cannot contain path separators")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(RagError::Config(format!("collection name '{name}' {reason}"))),
        None => Ok(()),
    }
}

/// Known vector store backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorStoreKind {
    Memory,
    SurrealDb,
    Qdrant,
}

impl VectorStoreKind {
    pub const ALL: [VectorStoreKind; 3] =
        [VectorStoreKind::Memory, VectorStoreKind::SurrealDb, VectorStoreKind::Qdrant];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::SurrealDb => "surrealdb",
            Self::Qdrant => "qdrant",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for VectorStoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VectorStoreKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" => Ok(Self::Memory),
            "surrealdb" | "surreal" => Ok(Self::SurrealDb),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(RagError::unsupported("Vector store", s, &Self::names())),
        }
    }
}

/// Where a backend keeps its data.
#[derive(Debug, Clone, Default)]
pub struct VectorStoreSettings {
    /// Persistence directory for `memory`, RocksDB directory for `surrealdb`.
    pub path: Option<PathBuf>,
    /// Remote endpoint, e.g. `ws://localhost:8000` for `surrealdb` or
    /// `http://localhost:6334` for `qdrant`.
    pub url: Option<String>,
}

/// Opens the backend registered under `backend`.
///
/// A `memory` store with a path reloads any collections saved there.
/// `qdrant` always talks to a server and reads its API key from
/// `QDRANT_API_KEY`.
pub async fn resolve_vector_store(
    backend: &str,
    settings: VectorStoreSettings,
) -> Result<Arc<dyn VectorStore>> {
    let kind: VectorStoreKind = backend.parse()?;
    tracing::debug!(backend = %kind, path = ?settings.path, "opening vector store");

    match kind {
        VectorStoreKind::Memory => match settings.path {
            Some(path) => Ok(Arc::new(InMemoryVectorStore::open(path).await?)),
            None => Ok(Arc::new(InMemoryVectorStore::new())),
        },
        #[cfg(feature = "surrealdb")]
        VectorStoreKind::SurrealDb => {
            use crate::surrealdb::SurrealVectorStore;
            let store = match (settings.url, settings.path) {
                (Some(url), _) => SurrealVectorStore::remote(&url).await?,
                (None, Some(path)) => SurrealVectorStore::rocksdb(&path.to_string_lossy()).await?,
                (None, None) => SurrealVectorStore::in_memory().await?,
            };
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "surrealdb"))]
        VectorStoreKind::SurrealDb => Err(RagError::FeatureDisabled {
            kind: "Vector store",
            name: kind.as_str().to_string(),
            feature: "surrealdb",
        }),
        #[cfg(feature = "qdrant")]
        VectorStoreKind::Qdrant => {
            let store = crate::qdrant::QdrantVectorStore::from_env(settings.url.as_deref())?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "qdrant"))]
        VectorStoreKind::Qdrant => Err(RagError::FeatureDisabled {
            kind: "Vector store",
            name: kind.as_str().to_string(),
            feature: "qdrant",
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_aliases() {
        assert_eq!("memory".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Memory);
        assert_eq!("InMemory".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Memory);
        assert_eq!("surrealdb".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::SurrealDb);
        assert_eq!(" Qdrant ".parse::<VectorStoreKind>().unwrap(), VectorStoreKind::Qdrant);
    }

    #[test]
    fn collection_names_stay_inside_the_store() {
        assert!(validate_collection_name("notes-v2.1").is_ok());
        for name in ["", "  ", ".", "..", "../x", "a/b", "a\\b", "c:notes"] {
            assert!(matches!(validate_collection_name(name), Err(RagError::Config(_))), "{name:?}");
        }
    }

    #[tokio::test]
    async fn unknown_backend_fails_fast() {
        let err = resolve_vector_store("chroma", VectorStoreSettings::default()).await.err().unwrap();
        assert!(matches!(err, RagError::UnsupportedProvider { .. }));
        assert!(err.to_string().contains("memory, surrealdb, qdrant"));
    }

    #[cfg(not(feature = "surrealdb"))]
    #[tokio::test]
    async fn surrealdb_requires_feature() {
        let err =
            resolve_vector_store("surrealdb", VectorStoreSettings::default()).await.err().unwrap();
        assert!(matches!(err, RagError::FeatureDisabled { feature: "surrealdb", .. }));
    }

    #[cfg(not(feature = "qdrant"))]
    #[tokio::test]
    async fn qdrant_requires_feature() {
        let settings = VectorStoreSettings { url: Some("http://localhost:6334".into()), ..Default::default() };
        let err = resolve_vector_store("qdrant", settings).await.err().unwrap();
        assert!(matches!(err, RagError::FeatureDisabled { feature: "qdrant", .. }));
    }
}
