//! Vector store on SurrealDB.
//!
//! A collection is a table holding one record per chunk, keyed by chunk id,
//! with an HNSW index (cosine distance) over the `embedding` field. Three
//! deployments share the same code path:
//!
//! ```rust,ignore
//! use openrag_rag::surrealdb::SurrealVectorStore;
//!
//! let scratch = SurrealVectorStore::in_memory().await?;
//! let on_disk = SurrealVectorStore::rocksdb("index/surreal").await?;
//! let shared = SurrealVectorStore::remote("ws://localhost:8000").await?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use surrealdb::Surreal;
use surrealdb::engine::any::{Any, connect};
use tracing::debug;

use crate::document::{Chunk, Filter, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

const NAMESPACE: &str = "openrag";
const DATABASE: &str = "vectors";

fn store_err(message: impl Into<String>) -> RagError {
    RagError::VectorStoreError { backend: "surrealdb".to_string(), message: message.into() }
}

fn surreal_err(e: surrealdb::Error) -> RagError {
    store_err(e.to_string())
}

/// A collection name made safe to splice into SurrealQL.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Table(String);

impl Table {
    fn for_collection(collection: &str) -> Result<Self> {
        let name: String = collection
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
            .collect();
        if name.is_empty() {
            return Err(store_err("collection name must not be empty"));
        }
        Ok(Self(name))
    }

    fn as_str(&self) -> &str {
        &self.0
    }

    fn schema(&self, dimensions: usize) -> String {
        let t = &self.0;
        format!(
            "DEFINE TABLE IF NOT EXISTS {t}; \
             DEFINE FIELD IF NOT EXISTS text ON {t} TYPE string; \
             DEFINE FIELD IF NOT EXISTS embedding ON {t} TYPE array<float>; \
             DEFINE FIELD IF NOT EXISTS metadata ON {t} FLEXIBLE TYPE object; \
             DEFINE FIELD IF NOT EXISTS document_id ON {t} TYPE string; \
             DEFINE INDEX IF NOT EXISTS {t}_embedding_hnsw ON {t} \
                 FIELDS embedding HNSW DIMENSION {dimensions} DIST COSINE;"
        )
    }

    /// KNN query over this table plus the filter values to bind.
    ///
    /// Filter keys are spliced into the statement, so only plain identifiers
    /// are accepted; values are always bound.
    fn knn_query(&self, top_k: usize, filter: Option<&Filter>) -> Result<(String, Vec<(String, String)>)> {
        let mut conditions = vec![format!("embedding <|{top_k},COSINE|> $embedding")];
        let mut bindings = Vec::new();
        for (position, (field, value)) in filter.into_iter().flat_map(Filter::iter).enumerate() {
            let identifier = !field.is_empty()
                && field.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !identifier {
                return Err(store_err(format!("metadata field '{field}' cannot be used in a filter")));
            }
            conditions.push(format!("metadata.{field} = $meta_{position}"));
            bindings.push((format!("meta_{position}"), value.clone()));
        }

        let sql = format!(
            "SELECT id, text, metadata, document_id, vector::distance::knn() AS distance \
             FROM {} WHERE {} ORDER BY distance;",
            self.0,
            conditions.join(" AND ")
        );
        Ok((sql, bindings))
    }
}

/// Stored form of a chunk; the record key is the chunk id.
#[derive(Debug, Serialize, Deserialize)]
struct Record {
    text: String,
    embedding: Vec<f32>,
    metadata: HashMap<String, String>,
    document_id: String,
}

impl From<&Chunk> for Record {
    fn from(chunk: &Chunk) -> Self {
        Self {
            text: chunk.text.clone(),
            embedding: chunk.embedding.clone(),
            metadata: chunk.metadata.clone(),
            document_id: chunk.document_id.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Hit {
    id: surrealdb::RecordId,
    text: String,
    metadata: HashMap<String, String>,
    document_id: String,
    distance: f32,
}

impl Hit {
    fn into_result(self) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: self.id.key().to_string(),
                text: self.text,
                embedding: Vec::new(),
                metadata: self.metadata,
                document_id: self.document_id,
            },
            score: 1.0 - self.distance,
        }
    }
}

/// [`VectorStore`] on a SurrealDB connection.
pub struct SurrealVectorStore {
    db: Surreal<Any>,
}

impl SurrealVectorStore {
    /// Embedded engine; data is lost when the process exits.
    pub async fn in_memory() -> Result<Self> {
        Self::open("mem://").await
    }

    /// Embedded engine persisted by RocksDB in `path`.
    pub async fn rocksdb(path: &str) -> Result<Self> {
        Self::open(&format!("rocksdb://{path}")).await
    }

    /// A running server, e.g. `ws://localhost:8000`.
    pub async fn remote(url: &str) -> Result<Self> {
        Self::open(url).await
    }

    /// Uses `db` as is; the caller picks namespace and database.
    pub fn from_connection(db: Surreal<Any>) -> Self {
        Self { db }
    }

    async fn open(endpoint: &str) -> Result<Self> {
        let db = connect(endpoint).await.map_err(surreal_err)?;
        db.use_ns(NAMESPACE).use_db(DATABASE).await.map_err(surreal_err)?;
        debug!(endpoint, namespace = NAMESPACE, database = DATABASE, "opened surrealdb");
        Ok(Self { db })
    }
}

#[async_trait]
impl VectorStore for SurrealVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        let table = Table::for_collection(name)?;
        self.db.query(table.schema(dimensions)).await.map_err(surreal_err)?;
        debug!(collection = name, table = table.as_str(), dimensions, "defined table");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        let table = Table::for_collection(name)?;
        self.db
            .query(format!("REMOVE TABLE IF EXISTS {};", table.as_str()))
            .await
            .map_err(surreal_err)?;
        debug!(collection = name, table = table.as_str(), "removed table");
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        let table = Table::for_collection(collection)?;
        for chunk in chunks {
            let _: Option<Record> = self
                .db
                .upsert((table.as_str(), chunk.id.as_str()))
                .content(Record::from(chunk))
                .await
                .map_err(surreal_err)?;
        }
        debug!(collection, records = chunks.len(), "upserted records");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        let table = Table::for_collection(collection)?;
        for id in ids {
            let _: Option<Record> =
                self.db.delete((table.as_str(), *id)).await.map_err(surreal_err)?;
        }
        debug!(collection, records = ids.len(), "deleted records");
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<SearchResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let table = Table::for_collection(collection)?;
        let (sql, bindings) = table.knn_query(top_k, filter)?;

        let mut query = self.db.query(sql).bind(("embedding", embedding.to_vec()));
        for binding in bindings {
            query = query.bind(binding);
        }
        let mut response = query.await.map_err(surreal_err)?;
        let hits: Vec<Hit> = response.take(0).map_err(surreal_err)?;

        Ok(hits.into_iter().map(Hit::into_result).collect())
    }
}
