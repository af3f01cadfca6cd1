//! HTTP embedding and re-ranking clients against a mock server.

use std::sync::Arc;

use openrag_rag::embedding::{HuggingFaceEmbedding, OllamaEmbedding};
use openrag_rag::reranker::parse_ranked_results;
use openrag_rag::{Document, EmbeddingProvider, Filter, HttpReranker, RagError, Reranker, Retriever, VectorIndex};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn ollama_embeds_a_batch_in_one_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .and(body_partial_json(json!({ "model": "nomic-embed-text", "input": ["a", "b"] })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "embeddings": [[0.1, 0.2], [0.3, 0.4]] })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let embedder = OllamaEmbedding::new("nomic-embed-text").unwrap().with_base_url(server.uri());
    let vectors = embedder.embed_batch(&["a", "b"]).await.unwrap();
    assert_eq!(vectors, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
}

#[tokio::test]
async fn ollama_reports_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model 'missing' not found"))
        .mount(&server)
        .await;

    let embedder = OllamaEmbedding::new("missing").unwrap().with_base_url(server.uri());
    let err = embedder.embed("hello").await.unwrap_err();
    match err {
        RagError::EmbeddingError { provider, message } => {
            assert_eq!(provider, "ollama");
            assert!(message.contains("not found"), "{message}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn huggingface_mean_pools_token_embeddings() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/models/BAAI/bge-small-en-v1.5/pipeline/feature-extraction"))
        .and(header("authorization", "Bearer hf_test"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([[[1.0, 0.0], [0.0, 1.0]]])),
        )
        .mount(&server)
        .await;

    let embedder = HuggingFaceEmbedding::new("BAAI/bge-small-en-v1.5")
        .unwrap()
        .with_base_url(server.uri())
        .with_api_key("hf_test");
    assert_eq!(embedder.embed("hello").await.unwrap(), vec![0.5, 0.5]);
}

#[tokio::test]
async fn huggingface_rejects_short_responses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([[0.1, 0.2]])))
        .mount(&server)
        .await;

    let embedder = HuggingFaceEmbedding::new("m").unwrap().with_base_url(server.uri());
    let err = embedder.embed_batch(&["a", "b"]).await.unwrap_err();
    assert!(err.to_string().contains("expected 2 embeddings"), "{err}");
}

#[tokio::test]
async fn http_reranker_maps_hits_to_ranks() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .and(header("authorization", "Bearer secret"))
        .and(body_partial_json(json!({ "query": "cats", "top_n": 3 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "index": 2, "relevance_score": 0.4 },
                { "index": 0, "relevance_score": 0.9 },
                { "index": 1, "relevance_score": 0.1 }
            ]
        })))
        .mount(&server)
        .await;

    let reranker = HttpReranker::new("rerank-test").with_base_url(server.uri()).with_api_key("secret");
    let candidates = vec!["first".to_string(), "second".to_string(), "third".to_string()];
    let output = reranker.rank("cats", &candidates).await.unwrap();

    let ranked = parse_ranked_results(&output).unwrap();
    let order: Vec<(&str, u32)> = ranked.iter().map(|r| (r.text.as_str(), r.rank)).collect();
    assert_eq!(order, vec![("first", 1), ("third", 2), ("second", 3)]);
}

#[tokio::test]
async fn http_reranker_out_of_range_index_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "results": [{ "index": 7, "relevance_score": 0.5 }] })),
        )
        .mount(&server)
        .await;

    let reranker = HttpReranker::new("m").with_base_url(server.uri());
    let err = reranker.rank("q", &["only".to_string()]).await.unwrap_err();
    assert!(matches!(err, RagError::RerankerError { .. }), "{err}");
}

struct TwoDocuments;

#[async_trait::async_trait]
impl VectorIndex for TwoDocuments {
    async fn similarity_search(
        &self,
        _query: &str,
        k: usize,
        _filter: Option<&Filter>,
    ) -> openrag_rag::Result<Vec<Document>> {
        Ok(["one", "two"].into_iter().take(k).map(Document::new).collect())
    }
}

#[tokio::test]
async fn retriever_reports_bodies_without_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rerank"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "detail": "quota exceeded" })))
        .mount(&server)
        .await;

    let reranker = HttpReranker::new("m").with_base_url(server.uri());
    let retriever = Retriever::new(Arc::new(TwoDocuments)).with_reranker(Arc::new(reranker));
    let err = retriever.ranked_retrieval("q", 2, 2, None).await.unwrap_err();
    assert!(matches!(err, RagError::MalformedRerankerOutput(_)), "{err}");
}
