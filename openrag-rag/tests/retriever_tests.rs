//! End-to-end retrieval over a small cats/dogs corpus.
//!
//! Embeddings come from a two-word vocabulary so similarity scores are exact,
//! the language model is scripted and re-ranking is lexical.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use openrag_core::Llm;
use openrag_model::{MockLlm, RetryConfig};
use openrag_rag::{
    Document, EmbeddingProvider, Filter, PromptConfig, QueryRephraser, RagError, RagPipeline,
    RelevanceClassifier, RetrievalConfig, RetrievalStrategy, Retriever, Reranker,
    TermOverlapReranker, VectorIndex,
};
use proptest::prelude::*;
use serde_json::{Value, json};

const A: &str = "A is about cats";
const B: &str = "B is about dogs";
const C: &str = "C is about cats and dogs";

const VARIANTS: &str = r#"{"rephrased_queries": ["cats", "feline", "kitten", "pets"]}"#;

/// Counts of "cats" and "dogs"; every other word maps to nothing.
struct VocabularyEmbedding;

#[async_trait]
impl EmbeddingProvider for VocabularyEmbedding {
    fn name(&self) -> &str {
        "vocabulary"
    }

    fn model(&self) -> &str {
        "cats-dogs"
    }

    async fn embed(&self, text: &str) -> openrag_rag::Result<Vec<f32>> {
        let lower = text.to_lowercase();
        let count = |word: &str| lower.split_whitespace().filter(|w| *w == word).count() as f32;
        Ok(vec![count("cats"), count("dogs")])
    }
}

/// Answers with a fixed body no matter the input.
struct CannedReranker(Value);

#[async_trait]
impl Reranker for CannedReranker {
    fn name(&self) -> &str {
        "canned"
    }

    async fn rank(&self, _query: &str, _candidates: &[String]) -> openrag_rag::Result<Value> {
        Ok(self.0.clone())
    }
}

/// Returns the first `k` of a fixed list, ignoring the query.
struct FixedIndex(Vec<String>);

#[async_trait]
impl VectorIndex for FixedIndex {
    async fn similarity_search(
        &self,
        _query: &str,
        k: usize,
        _filter: Option<&Filter>,
    ) -> openrag_rag::Result<Vec<Document>> {
        Ok(self.0.iter().take(k).map(Document::new).collect())
    }
}

fn instant_retry() -> RetryConfig {
    RetryConfig::default()
        .with_max_retries(2)
        .with_initial_delay(Duration::ZERO)
        .with_max_delay(Duration::ZERO)
}

async fn corpus_index() -> Arc<dyn VectorIndex> {
    let pipeline = RagPipeline::builder()
        .embedding_provider(Arc::new(VocabularyEmbedding))
        .collection("pets")
        .build()
        .unwrap();
    let documents = vec![
        Document::new(A).with_id("a").with_metadata("topic", "cats"),
        Document::new(B).with_id("b").with_metadata("topic", "dogs"),
        Document::new(C).with_id("c").with_metadata("topic", "both"),
    ];
    let chunks = pipeline.ingest(&documents).await.unwrap();
    assert_eq!(chunks.len(), 3);
    Arc::new(pipeline.index())
}

fn rephraser(llm: Arc<dyn Llm>) -> Arc<QueryRephraser> {
    Arc::new(
        QueryRephraser::new(llm, &PromptConfig::default())
            .unwrap()
            .with_retry_config(instant_retry()),
    )
}

fn classifier(llm: Arc<dyn Llm>) -> Arc<RelevanceClassifier> {
    Arc::new(
        RelevanceClassifier::new(llm, &PromptConfig::default())
            .unwrap()
            .with_retry_config(instant_retry()),
    )
}

/// Marks content relevant when it mentions cats after "about".
fn cat_judge() -> MockLlm {
    MockLlm::from_fn("judge", |request| {
        let prompt = request.contents[0].text();
        Ok(if prompt.contains("about cats") {
            r#"{"related": true}"#.to_string()
        } else {
            r#"{"related": false}"#.to_string()
        })
    })
}

#[tokio::test]
async fn naive_retrieval_returns_closest_documents_in_index_order() {
    let retriever = Retriever::new(corpus_index().await);

    let texts = retriever.naive_retrieval("cats", 2, None).await.unwrap();
    assert_eq!(texts, vec![A, C]);

    let all = retriever.naive_retrieval("cats", 10, None).await.unwrap();
    assert_eq!(all, vec![A, C, B]);

    assert!(retriever.naive_retrieval("cats", 0, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn filters_restrict_candidates_and_metadata_survives() {
    let retriever = Retriever::new(corpus_index().await);

    let filter = Filter::new().eq("topic", "dogs");
    let texts = retriever.naive_retrieval("cats", 3, Some(&filter)).await.unwrap();
    assert_eq!(texts, vec![B]);

    let documents = retriever.search_documents("cats", 1, None).await.unwrap();
    assert_eq!(documents[0].text, A);
    assert_eq!(documents[0].metadata.get("topic").map(String::as_str), Some("cats"));
    assert_eq!(documents[0].id, "a_0");
}

#[tokio::test]
async fn ranked_retrieval_orders_by_rank_and_truncates() {
    let retriever =
        Retriever::new(corpus_index().await).with_reranker(Arc::new(TermOverlapReranker::new()));

    let texts = retriever.ranked_retrieval("dogs", 3, 2, None).await.unwrap();
    assert_eq!(texts, vec![B, C]);

    let again = retriever.ranked_retrieval("dogs", 3, 2, None).await.unwrap();
    assert_eq!(texts, again);
}

#[tokio::test]
async fn ranked_retrieval_rejects_search_k_below_output_k() {
    let retriever =
        Retriever::new(corpus_index().await).with_reranker(Arc::new(TermOverlapReranker::new()));
    let err = retriever.ranked_retrieval("cats", 2, 3, None).await.unwrap_err();
    assert!(matches!(err, RagError::Config(_)), "{err}");
}

#[tokio::test]
async fn ranked_retrieval_drops_blank_candidates() {
    let index = FixedIndex(vec!["cats".into(), "   ".into(), String::new(), "dogs".into()]);
    let retriever = Retriever::new(Arc::new(index)).with_reranker(Arc::new(TermOverlapReranker));

    let texts = retriever.ranked_retrieval("dogs", 4, 4, None).await.unwrap();
    assert_eq!(texts, vec!["dogs", "cats"]);
}

#[tokio::test]
async fn malformed_reranker_output_is_an_error() {
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(CannedReranker(json!({ "ranking": [] }))));
    let err = retriever.ranked_retrieval("cats", 3, 2, None).await.unwrap_err();
    assert!(matches!(err, RagError::MalformedRerankerOutput(_)), "{err}");

    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(CannedReranker(json!({ "results": [{ "text": A }] }))));
    let err = retriever.ranked_retrieval("cats", 3, 2, None).await.unwrap_err();
    assert!(matches!(err, RagError::MalformedRerankerOutput(_)), "{err}");
}

#[tokio::test]
async fn rephrased_retrieval_merges_variants_and_keeps_duplicates() {
    let llm = Arc::new(MockLlm::new("rephraser").with_response(VARIANTS));
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_rephraser(rephraser(llm.clone()));

    let texts = retriever.ranked_retrieval_with_rephrasing("cats", 5, None).await.unwrap();
    assert_eq!(texts, vec![A, C, A, C, A]);
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn failed_rephrasing_falls_back_to_the_original_query() {
    let llm = Arc::new(MockLlm::new("rephraser").with_response("no json here"));
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_rephraser(rephraser(llm.clone()));

    let texts = retriever.ranked_retrieval_with_rephrasing("cats", 5, None).await.unwrap();
    assert_eq!(texts, vec![A, C, B]);
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn classified_retrieval_keeps_only_relevant_candidates() {
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_classifier(classifier(Arc::new(cat_judge())));

    let texts = retriever.ranked_retrieval_with_llm("cats", 15, 5, None).await.unwrap();
    assert_eq!(texts, vec![A, C]);

    let top = retriever.ranked_retrieval_with_llm("cats", 15, 1, None).await.unwrap();
    assert_eq!(top, vec![A]);
}

#[tokio::test]
async fn classified_retrieval_with_nothing_relevant_is_empty() {
    let llm = Arc::new(MockLlm::new("judge").with_response(r#"{"related": false}"#));
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_classifier(classifier(llm.clone()));

    let texts = retriever.ranked_retrieval_with_llm("cats", 15, 5, None).await.unwrap();
    assert!(texts.is_empty());
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn unclassifiable_candidates_are_skipped() {
    let llm = MockLlm::from_fn("judge", |request| {
        let prompt = request.contents[0].text();
        Ok(if prompt.contains(B) {
            "I would rather not say".to_string()
        } else {
            r#"{"related": true}"#.to_string()
        })
    });
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_classifier(classifier(Arc::new(llm)));

    let texts = retriever.ranked_retrieval_with_llm("cats", 15, 5, None).await.unwrap();
    assert_eq!(texts, vec![A, C]);
}

#[tokio::test]
async fn concurrent_classification_preserves_candidate_order() {
    let config = RetrievalConfig { classification_concurrency: 3, ..RetrievalConfig::default() };
    let retriever = Retriever::new(corpus_index().await)
        .with_reranker(Arc::new(TermOverlapReranker::new()))
        .with_classifier(classifier(Arc::new(cat_judge())))
        .with_config(config);

    let texts = retriever.retrieve(RetrievalStrategy::Classified, "cats", None).await.unwrap();
    assert_eq!(texts, vec![A, C]);
}

#[tokio::test]
async fn strategies_without_collaborators_fail_with_config_errors() {
    let retriever = Retriever::new(corpus_index().await);

    for strategy in [RetrievalStrategy::Ranked, RetrievalStrategy::Rephrased, RetrievalStrategy::Classified] {
        let err = retriever.retrieve(strategy, "cats", None).await.unwrap_err();
        assert!(matches!(err, RagError::Config(_)), "{strategy}: {err}");
    }

    let texts = retriever.retrieve(RetrievalStrategy::Naive, "cats", None).await.unwrap();
    assert_eq!(texts, vec![A, C, B]);
}

fn arb_candidates() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            Just(String::new()),
            Just("  ".to_string()),
            "(cats|dogs|birds)( (cats|dogs|birds)){0,3}",
        ],
        0..12,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Ranked retrieval returns `min(output_k, non-blank candidates)` texts,
    /// never ranks a candidate with fewer shared terms ahead of one with more,
    /// and gives the same answer twice.
    #[test]
    fn prop_ranked_retrieval_orders_and_truncates(
        candidates in arb_candidates(),
        output_k in 1usize..8,
    ) {
        let rt = tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap();
        let search_k = candidates.len().max(output_k);
        let retriever = Retriever::new(Arc::new(FixedIndex(candidates.clone())))
            .with_reranker(Arc::new(TermOverlapReranker::new()));

        let first = rt.block_on(retriever.ranked_retrieval("cats dogs", search_k, output_k, None)).unwrap();
        let second = rt.block_on(retriever.ranked_retrieval("cats dogs", search_k, output_k, None)).unwrap();

        let non_blank = candidates.iter().filter(|c| !c.trim().is_empty()).count();
        prop_assert_eq!(first.len(), output_k.min(non_blank));
        prop_assert_eq!(&first, &second);

        let shared = |text: &str| {
            let words: std::collections::HashSet<&str> = text.split_whitespace().collect();
            ["cats", "dogs"].iter().filter(|w| words.contains(*w)).count()
        };
        for pair in first.windows(2) {
            prop_assert!(shared(&pair[0]) >= shared(&pair[1]), "{:?}", first);
        }
    }
}
