//! Retrieval strategies over a [`VectorIndex`].
//!
//! | Strategy    | Flow                                                         |
//! |-------------|--------------------------------------------------------------|
//! | `naive`     | similarity search                                            |
//! | `ranked`    | search `search_k`, re-rank, keep `output_k`                  |
//! | `rephrase`  | rephrase into 4 variants, ranked search each, re-rank pool   |
//! | `llm`       | search, keep candidates the classifier marks relevant, re-rank if too many |
//!
//! Every strategy returns candidate texts, best first.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use futures::future::try_join_all;
use openrag_telemetry::{Instrument, retrieval_span};
use tracing::{debug, warn};

use crate::classifier::RelevanceClassifier;
use crate::config::RetrievalConfig;
use crate::document::{Document, Filter};
use crate::error::{RagError, Result};
use crate::index::VectorIndex;
use crate::rephraser::QueryRephraser;
use crate::reranker::{RankedResult, Reranker, parse_ranked_results};

/// The four retrieval strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RetrievalStrategy {
    Naive,
    Ranked,
    Rephrased,
    Classified,
}

impl RetrievalStrategy {
    pub const ALL: [RetrievalStrategy; 4] = [
        RetrievalStrategy::Naive,
        RetrievalStrategy::Ranked,
        RetrievalStrategy::Rephrased,
        RetrievalStrategy::Classified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Naive => "naive",
            Self::Ranked => "ranked",
            Self::Rephrased => "rephrase",
            Self::Classified => "llm",
        }
    }
}

impl fmt::Display for RetrievalStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetrievalStrategy {
    type Err = RagError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "naive" => Ok(Self::Naive),
            "ranked" | "rerank" => Ok(Self::Ranked),
            "rephrase" | "rephrased" | "rephrasing" => Ok(Self::Rephrased),
            "llm" | "classify" | "classified" => Ok(Self::Classified),
            _ => Err(RagError::unsupported(
                "Retrieval strategy",
                s,
                &Self::ALL.map(|strategy| strategy.as_str()),
            )),
        }
    }
}

/// Orders re-ranked results by `(rank, candidate position)`.
///
/// Duplicate texts map to successive candidate positions, so equal-rank
/// duplicates keep their original order. A text that matches no candidate
/// sorts after every known candidate of the same rank.
pub fn order_by_rank(candidates: &[String], ranked: Vec<RankedResult>) -> Vec<String> {
    let mut positions: HashMap<&str, VecDeque<usize>> = HashMap::new();
    for (index, candidate) in candidates.iter().enumerate() {
        positions.entry(candidate.as_str()).or_default().push_back(index);
    }

    let mut keyed: Vec<(u32, usize, String)> = ranked
        .into_iter()
        .map(|result| {
            let position = positions
                .get_mut(result.text.as_str())
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    warn!(text = %result.text, "re-ranker returned a text that is not a candidate");
                    usize::MAX
                });
            (result.rank, position, result.text)
        })
        .collect();
    keyed.sort_by_key(|(rank, position, _)| (*rank, *position));
    keyed.into_iter().map(|(_, _, text)| text).collect()
}

/// Composes a vector index with optional re-ranking, rephrasing and
/// classification.
///
/// Holds no per-call state; share it behind an `Arc`.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn VectorIndex>,
    reranker: Option<Arc<dyn Reranker>>,
    rephraser: Option<Arc<QueryRephraser>>,
    classifier: Option<Arc<RelevanceClassifier>>,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(index: Arc<dyn VectorIndex>) -> Self {
        Self {
            index,
            reranker: None,
            rephraser: None,
            classifier: None,
            config: RetrievalConfig::default(),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_rephraser(mut self, rephraser: Arc<QueryRephraser>) -> Self {
        self.rephraser = Some(rephraser);
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<RelevanceClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    fn require_reranker(&self, strategy: RetrievalStrategy) -> Result<&Arc<dyn Reranker>> {
        self.reranker
            .as_ref()
            .ok_or_else(|| RagError::Config(format!("{strategy} retrieval requires a re-ranker")))
    }

    /// Runs `strategy` with the configured counts.
    pub async fn retrieve(
        &self,
        strategy: RetrievalStrategy,
        query: &str,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        let RetrievalConfig { top_k, search_k, output_k, .. } = self.config;
        match strategy {
            RetrievalStrategy::Naive => self.naive_retrieval(query, top_k, filter).await,
            RetrievalStrategy::Ranked => self.ranked_retrieval(query, search_k, output_k, filter).await,
            RetrievalStrategy::Rephrased => {
                self.ranked_retrieval_with_rephrasing(query, output_k, filter).await
            }
            RetrievalStrategy::Classified => {
                self.ranked_retrieval_with_llm(query, search_k, output_k, filter).await
            }
        }
    }

    /// The top `k` documents in index order, with their metadata.
    pub async fn search_documents(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<Document>> {
        self.index.similarity_search(query, k, filter).await
    }

    /// The texts of the top `k` documents, in index order.
    pub async fn naive_retrieval(
        &self,
        query: &str,
        k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        async {
            let documents = self.index.similarity_search(query, k, filter).await?;
            debug!(requested = k, returned = documents.len(), "naive retrieval");
            Ok(documents.into_iter().map(|document| document.text).collect())
        }
        .instrument(retrieval_span(RetrievalStrategy::Naive.as_str()))
        .await
    }

    /// Searches `search_k` candidates, re-ranks them against `query` and
    /// keeps the best `output_k`.
    pub async fn ranked_retrieval(
        &self,
        query: &str,
        search_k: usize,
        output_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        self.ranked_inner(query, search_k, output_k, filter)
            .instrument(retrieval_span(RetrievalStrategy::Ranked.as_str()))
            .await
    }

    async fn ranked_inner(
        &self,
        query: &str,
        search_k: usize,
        output_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        if search_k < output_k {
            return Err(RagError::Config(format!(
                "search_k ({search_k}) must be at least output_k ({output_k})"
            )));
        }
        let reranker = self.require_reranker(RetrievalStrategy::Ranked)?;

        let candidates = self.candidates(query, search_k, filter).await?;
        let ranked = rerank(reranker.as_ref(), query, candidates, output_k).await?;
        debug!(query, returned = ranked.len(), "ranked retrieval");
        Ok(ranked)
    }

    /// Expands `query` into rephrasings, runs ranked retrieval for each and
    /// re-ranks the pooled results against the original query.
    ///
    /// When rephrasing fails the original query is used alone.
    pub async fn ranked_retrieval_with_rephrasing(
        &self,
        query: &str,
        output_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        async {
            let rephraser = self.rephraser.as_ref().ok_or_else(|| {
                RagError::Config("rephrase retrieval requires a query rephraser".to_string())
            })?;
            let reranker = self.require_reranker(RetrievalStrategy::Rephrased)?;
            let search_k = self.config.search_k.max(output_k);

            let variants = match rephraser.rephrase(query).await {
                Ok(set) => set.into_queries(),
                Err(error @ RagError::RephraseFailed { .. }) => {
                    warn!(query, error = %error, "rephrasing failed; searching with the original query");
                    vec![query.to_string()]
                }
                Err(error) => return Err(error),
            };

            let per_variant = try_join_all(
                variants.iter().map(|variant| self.ranked_inner(variant, search_k, output_k, filter)),
            )
            .await?;
            let pool: Vec<String> = per_variant.into_iter().flatten().collect();
            debug!(variants = variants.len(), pooled = pool.len(), "merged rephrased results");

            rerank(reranker.as_ref(), query, pool, output_k).await
        }
        .instrument(retrieval_span(RetrievalStrategy::Rephrased.as_str()))
        .await
    }

    /// Keeps the candidates the classifier judges relevant; re-ranks them
    /// only when more than `output_k` remain.
    ///
    /// Candidates whose classification fails are skipped.
    pub async fn ranked_retrieval_with_llm(
        &self,
        query: &str,
        search_k: usize,
        output_k: usize,
        filter: Option<&Filter>,
    ) -> Result<Vec<String>> {
        async {
            let classifier = self.classifier.as_ref().ok_or_else(|| {
                RagError::Config("llm retrieval requires a relevance classifier".to_string())
            })?;
            let reranker = self.require_reranker(RetrievalStrategy::Classified)?;

            let candidates = self.candidates(query, search_k, filter).await?;
            let concurrency = self.config.classification_concurrency.max(1);
            let labels: Vec<(String, Result<bool>)> = stream::iter(candidates)
                .map(|candidate| async move {
                    let label = classifier.classify(query, &candidate).await;
                    (candidate, label)
                })
                .buffered(concurrency)
                .collect()
                .await;

            let mut relevant = Vec::new();
            for (candidate, label) in labels {
                match label {
                    Ok(true) => relevant.push(candidate),
                    Ok(false) => {}
                    Err(error @ RagError::ClassifyFailed { .. }) => {
                        warn!(error = %error, "skipping candidate that could not be classified");
                    }
                    Err(error) => return Err(error),
                }
            }
            debug!(relevant = relevant.len(), "classified candidates");

            if relevant.len() > output_k {
                rerank(reranker.as_ref(), query, relevant, output_k).await
            } else {
                Ok(relevant)
            }
        }
        .instrument(retrieval_span(RetrievalStrategy::Classified.as_str()))
        .await
    }

    /// Search results with blank texts removed, in index order.
    async fn candidates(&self, query: &str, k: usize, filter: Option<&Filter>) -> Result<Vec<String>> {
        let documents = self.index.similarity_search(query, k, filter).await?;
        let found = documents.len();
        let candidates: Vec<String> = documents
            .into_iter()
            .map(|document| document.text)
            .filter(|text| !text.trim().is_empty())
            .collect();
        debug!(found, kept = candidates.len(), "collected candidates");
        Ok(candidates)
    }
}

/// Re-ranks `candidates` against `query` and keeps the first `output_k`.
async fn rerank(
    reranker: &dyn Reranker,
    query: &str,
    candidates: Vec<String>,
    output_k: usize,
) -> Result<Vec<String>> {
    if candidates.is_empty() {
        return Ok(candidates);
    }
    let output = reranker.rank(query, &candidates).await?;
    let ranked = parse_ranked_results(&output)?;
    let mut ordered = order_by_rank(&candidates, ranked);
    ordered.truncate(output_k);
    Ok(ordered)
}
