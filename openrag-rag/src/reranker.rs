//! Re-rankers: order a small candidate set by relevance to a query.
//!
//! Every re-ranker answers in the same shape,
//! `{"results": [{"text": ..., "rank": ...}, ...]}`, where a lower rank is
//! more relevant. [`parse_ranked_results`] validates that shape.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::embedding::hashing::tokenize;
use crate::error::{RagError, Result};

/// One entry of a re-ranker's `results` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub text: String,
    pub rank: u32,
}

/// Re-scores candidates against a query.
#[async_trait]
pub trait Reranker: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `{"results": [{text, rank}]}` covering the candidates.
    async fn rank(&self, query: &str, candidates: &[String]) -> Result<Value>;
}

/// Extracts the `results` array of a re-ranker response.
pub fn parse_ranked_results(output: &Value) -> Result<Vec<RankedResult>> {
    let results = output
        .get("results")
        .ok_or_else(|| RagError::MalformedRerankerOutput("missing \"results\" field".to_string()))?;
    if !results.is_array() {
        return Err(RagError::MalformedRerankerOutput("\"results\" is not an array".to_string()));
    }
    serde_json::from_value(results.clone())
        .map_err(|e| RagError::MalformedRerankerOutput(format!("invalid result entry: {e}")))
}

fn results_value(ranked: impl IntoIterator<Item = (String, u32, f32)>) -> Value {
    let results: Vec<Value> = ranked
        .into_iter()
        .map(|(text, rank, score)| json!({ "text": text, "rank": rank, "score": score }))
        .collect();
    json!({ "results": results })
}

/// Ranks candidates by how many distinct query terms they contain.
///
/// Deterministic and offline. Ties keep candidate order.
#[derive(Debug, Clone, Default)]
pub struct TermOverlapReranker;

impl TermOverlapReranker {
    pub fn new() -> Self {
        Self
    }

    fn overlap(query_terms: &HashSet<String>, candidate: &str) -> usize {
        let terms: HashSet<String> = tokenize(candidate).into_iter().collect();
        query_terms.intersection(&terms).count()
    }
}

#[async_trait]
impl Reranker for TermOverlapReranker {
    fn name(&self) -> &str {
        "term-overlap"
    }

    async fn rank(&self, query: &str, candidates: &[String]) -> Result<Value> {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        let mut scored: Vec<(usize, usize)> = candidates
            .iter()
            .enumerate()
            .map(|(index, candidate)| (index, Self::overlap(&query_terms, candidate)))
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1));

        Ok(results_value(scored.into_iter().enumerate().map(|(position, (index, overlap))| {
            (candidates[index].clone(), position as u32 + 1, overlap as f32)
        })))
    }
}

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: &'a [String],
    top_n: usize,
}

#[derive(Debug, Deserialize)]
struct RerankHit {
    index: usize,
    relevance_score: f32,
}

pub const DEFAULT_HTTP_RERANK_BASE: &str = "https://api.jina.ai/v1";
pub const DEFAULT_HTTP_RERANK_MODEL: &str = "jina-reranker-v2-base-multilingual";

/// Client for Cohere/Jina-style `POST {base}/rerank` endpoints.
///
/// Hits of the form `{index, relevance_score}` are mapped to
/// `{text, rank}`. A response without `results` is returned as received.
pub struct HttpReranker {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl HttpReranker {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_HTTP_RERANK_BASE.to_string(),
            model: model.into(),
            api_key: std::env::var("RERANKER_API_KEY").ok().filter(|key| !key.is_empty()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn err(message: impl Into<String>) -> RagError {
        RagError::RerankerError { reranker: "http".to_string(), message: message.into() }
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    fn name(&self) -> &str {
        "http"
    }

    async fn rank(&self, query: &str, candidates: &[String]) -> Result<Value> {
        if candidates.is_empty() {
            return Ok(json!({ "results": [] }));
        }

        let url = format!("{}/rerank", self.base_url.trim_end_matches('/'));
        let mut request = self.client.post(&url).json(&RerankRequest {
            model: &self.model,
            query,
            documents: candidates,
            top_n: candidates.len(),
        });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await.map_err(|e| Self::err(format!("request failed: {e}")))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| Self::err(format!("failed to read body: {e}")))?;
        if !status.is_success() {
            return Err(Self::err(format!("API error ({status}): {body}")));
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| Self::err(format!("invalid JSON: {e}")))?;
        let Some(results) = value.get("results") else {
            return Ok(value);
        };
        let mut hits: Vec<RerankHit> = serde_json::from_value(results.clone())
            .map_err(|e| RagError::MalformedRerankerOutput(format!("invalid rerank hit: {e}")))?;
        hits.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));

        let mut ranked = Vec::with_capacity(hits.len());
        for (position, hit) in hits.into_iter().enumerate() {
            let text = candidates
                .get(hit.index)
                .ok_or_else(|| Self::err(format!("hit index {} out of range", hit.index)))?;
            ranked.push((text.clone(), position as u32 + 1, hit.relevance_score));
        }
        Ok(results_value(ranked))
    }
}

#[cfg(feature = "fastembed")]
pub use self::cross_encoder::FastEmbedReranker;

#[cfg(feature = "fastembed")]
mod cross_encoder {
    use std::sync::{Arc, Mutex};

    use ::fastembed::{RerankInitOptions, RerankerModel, TextRerank};
    use async_trait::async_trait;
    use serde_json::Value;

    use super::{Reranker, results_value};
    use crate::error::{RagError, Result};

    pub const DEFAULT_MODEL: &str = "BAAI/bge-reranker-base";

    fn err(message: impl Into<String>) -> RagError {
        RagError::RerankerError { reranker: "fastembed".to_string(), message: message.into() }
    }

    fn model_for(name: &str) -> Result<RerankerModel> {
        match name {
            "BAAI/bge-reranker-base" => Ok(RerankerModel::BGERerankerBase),
            "rozgo/bge-reranker-v2-m3" => Ok(RerankerModel::BGERerankerV2M3),
            "jinaai/jina-reranker-v1-turbo-en" => Ok(RerankerModel::JINARerankerV1TurboEn),
            other => Err(err(format!("unknown fastembed reranker '{other}'"))),
        }
    }

    /// Cross-encoder re-ranking with a local ONNX model.
    pub struct FastEmbedReranker {
        model: Arc<Mutex<TextRerank>>,
    }

    impl FastEmbedReranker {
        pub fn new(model_name: &str) -> Result<Self> {
            let options =
                RerankInitOptions::new(model_for(model_name)?).with_show_download_progress(false);
            let model = TextRerank::try_new(options)
                .map_err(|e| err(format!("failed to load '{model_name}': {e}")))?;
            Ok(Self { model: Arc::new(Mutex::new(model)) })
        }
    }

    #[async_trait]
    impl Reranker for FastEmbedReranker {
        fn name(&self) -> &str {
            "fastembed"
        }

        async fn rank(&self, query: &str, candidates: &[String]) -> Result<Value> {
            let model = Arc::clone(&self.model);
            let query = query.to_string();
            let documents = candidates.to_vec();
            let hits = tokio::task::spawn_blocking(move || {
                let mut guard = model.lock().map_err(|_| err("model lock poisoned"))?;
                let refs: Vec<&str> = documents.iter().map(String::as_str).collect();
                guard.rerank(query.as_str(), refs, false, None).map_err(|e| err(e.to_string()))
            })
            .await
            .map_err(|e| err(format!("rerank task failed: {e}")))??;

            let mut ranked = Vec::with_capacity(hits.len());
            for (position, hit) in hits.into_iter().enumerate() {
                let text =
                    candidates.get(hit.index).ok_or_else(|| err("hit index out of range"))?;
                ranked.push((text.clone(), position as u32 + 1, hit.score));
            }
            Ok(results_value(ranked))
        }
    }
}

/// Registered re-ranker names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RerankerKind {
    TermOverlap,
    Http,
    FastEmbed,
}

impl RerankerKind {
    pub const ALL: [RerankerKind; 3] = [RerankerKind::TermOverlap, RerankerKind::Http, RerankerKind::FastEmbed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TermOverlap => "term-overlap",
            Self::Http => "http",
            Self::FastEmbed => "fastembed",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|kind| kind.as_str()).collect()
    }
}

impl fmt::Display for RerankerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RerankerKind {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RagError::unsupported("Re-ranker", s, &Self::names()))
    }
}

/// Builds the re-ranker registered under `name`.
pub fn resolve_reranker(name: &str, model: Option<&str>) -> Result<Arc<dyn Reranker>> {
    let kind: RerankerKind = name.parse()?;
    tracing::debug!(reranker = %kind, model = ?model, "resolving re-ranker");
    match kind {
        RerankerKind::TermOverlap => Ok(Arc::new(TermOverlapReranker::new())),
        RerankerKind::Http => {
            Ok(Arc::new(HttpReranker::new(model.unwrap_or(DEFAULT_HTTP_RERANK_MODEL))))
        }
        #[cfg(feature = "fastembed")]
        RerankerKind::FastEmbed => {
            Ok(Arc::new(FastEmbedReranker::new(model.unwrap_or(cross_encoder::DEFAULT_MODEL))?))
        }
        #[cfg(not(feature = "fastembed"))]
        RerankerKind::FastEmbed => Err(RagError::FeatureDisabled {
            kind: "Re-ranker",
            name: kind.as_str().to_string(),
            feature: "fastembed",
        }),
    }
}
