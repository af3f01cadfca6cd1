//! Vector store on a Qdrant server.
//!
//! Each collection maps to a Qdrant collection with cosine distance. Point
//! ids are UUIDv5 digests of the chunk id, so upserting the same chunk
//! twice replaces it; the chunk id itself travels in the payload.
//!
//! ```rust,ignore
//! use openrag_rag::qdrant::QdrantVectorStore;
//!
//! let local = QdrantVectorStore::connect("http://localhost:6334", None)?;
//! let cloud = QdrantVectorStore::connect("https://xyz.cloud.qdrant.io:6334", Some(api_key))?;
//! ```

use std::collections::HashMap;

use async_trait::async_trait;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, DeletePointsBuilder, Distance, Filter as QdrantFilter, PointStruct,
    PointsIdsList, QueryPointsBuilder, ScoredPoint, UpsertPointsBuilder, Value, VectorParamsBuilder,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::document::{Chunk, Filter, SearchResult};
use crate::error::{RagError, Result};
use crate::vectorstore::VectorStore;

/// gRPC endpoint of a Qdrant server on this machine.
pub const DEFAULT_URL: &str = "http://localhost:6334";

/// Environment variable read for the API key of hosted clusters.
pub const API_KEY_ENV: &str = "QDRANT_API_KEY";

const METADATA_FIELD: &str = "metadata";

fn store_err(message: impl Into<String>) -> RagError {
    RagError::VectorStoreError { backend: "qdrant".to_string(), message: message.into() }
}

fn qdrant_err(e: qdrant_client::QdrantError) -> RagError {
    store_err(e.to_string())
}

/// Stable point id for a chunk id.
fn point_id(chunk_id: &str) -> String {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, chunk_id.as_bytes()).to_string()
}

fn to_point(chunk: &Chunk) -> Result<PointStruct> {
    let payload = Payload::try_from(json!({
        "chunk_id": chunk.id,
        "text": chunk.text,
        "document_id": chunk.document_id,
        "metadata": chunk.metadata,
    }))
    .map_err(qdrant_err)?;
    Ok(PointStruct::new(point_id(&chunk.id), chunk.embedding.clone(), payload))
}

/// Metadata equality as `must` conditions on the nested payload object.
fn to_filter(filter: Option<&Filter>) -> Option<QdrantFilter> {
    let conditions: Vec<Condition> = filter?
        .iter()
        .map(|(field, value)| Condition::matches(format!("{METADATA_FIELD}.{field}"), value.clone()))
        .collect();
    (!conditions.is_empty()).then(|| QdrantFilter::must(conditions))
}

fn string_of(value: &Value) -> Option<String> {
    match &value.kind {
        Some(Kind::StringValue(text)) => Some(text.clone()),
        _ => None,
    }
}

fn to_result(point: ScoredPoint) -> Result<SearchResult> {
    let payload = point.payload;
    let field = |name: &str| {
        payload
            .get(name)
            .and_then(string_of)
            .ok_or_else(|| store_err(format!("point is missing payload field '{name}'")))
    };
    let metadata = match payload.get(METADATA_FIELD).and_then(|value| value.kind.as_ref()) {
        Some(Kind::StructValue(fields)) => fields
            .fields
            .iter()
            .filter_map(|(key, value)| string_of(value).map(|value| (key.clone(), value)))
            .collect(),
        _ => HashMap::new(),
    };

    Ok(SearchResult {
        chunk: Chunk {
            id: field("chunk_id")?,
            text: field("text")?,
            embedding: Vec::new(),
            metadata,
            document_id: field("document_id")?,
        },
        score: point.score,
    })
}

/// [`VectorStore`] on a Qdrant client.
pub struct QdrantVectorStore {
    client: Qdrant,
}

impl QdrantVectorStore {
    /// Connects to the gRPC endpoint at `url`.
    pub fn connect(url: &str, api_key: Option<String>) -> Result<Self> {
        let client = Qdrant::from_url(url).api_key(api_key).build().map_err(qdrant_err)?;
        debug!(url, "connected to qdrant");
        Ok(Self { client })
    }

    /// `url` or [`DEFAULT_URL`], with the key from [`API_KEY_ENV`] if set.
    pub fn from_env(url: Option<&str>) -> Result<Self> {
        Self::connect(url.unwrap_or(DEFAULT_URL), std::env::var(API_KEY_ENV).ok())
    }

    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }
}

#[async_trait]
impl VectorStore for QdrantVectorStore {
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(qdrant_err)? {
            return Ok(());
        }
        let request = CreateCollectionBuilder::new(name)
            .vectors_config(VectorParamsBuilder::new(dimensions as u64, Distance::Cosine));
        if let Err(e) = self.client.create_collection(request).await {
            // Another writer may have created it in the meantime.
            if !self.client.collection_exists(name).await.map_err(qdrant_err)? {
                return Err(qdrant_err(e));
            }
        }
        debug!(collection = name, dimensions, "created qdrant collection");
        Ok(())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        if self.client.collection_exists(name).await.map_err(qdrant_err)? {
            self.client.delete_collection(name).await.map_err(qdrant_err)?;
        }
        Ok(())
    }

    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let points = chunks.iter().map(to_point).collect::<Result<Vec<_>>>()?;
        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(qdrant_err)?;
        debug!(collection, points = chunks.len(), "upserted points");
        Ok(())
    }

    async fn delete(&self, collection: &str, ids: &[&str]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let ids = PointsIdsList { ids: ids.iter().map(|id| point_id(id).into()).collect() };
        self.client
            .delete_points(DeletePointsBuilder::new(collection).points(ids).wait(true))
            .await
            .map_err(qdrant_err)?;
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
        let mut query = QueryPointsBuilder::new(collection)
            .query(embedding.to_vec())
            .limit(top_k as u64)
            .with_payload(true);
        if let Some(filter) = to_filter(filter) {
            query = query.filter(filter);
        }

        let response = self.client.query(query).await.map_err(qdrant_err)?;
        response.result.into_iter().map(to_result).collect()
    }
}
