//! Span helpers for common OpenRAG operations

use tracing::Span;

/// Create a span for one retrieval call
///
/// # Arguments
/// * `strategy` - Strategy name (`naive`, `ranked`, `rephrase`, `llm`)
///
/// # Example
/// ```
/// use openrag_telemetry::retrieval_span;
/// let span = retrieval_span("ranked");
/// let _enter = span.enter();
/// ```
pub fn retrieval_span(strategy: &str) -> Span {
    tracing::info_span!("retrieval", retrieval.strategy = strategy)
}

/// Create a span for a language model call
///
/// # Arguments
/// * `model_name` - Name of the model being called
/// * `purpose` - What the call is for, e.g. `rephrase` or `classify`
pub fn model_call_span(model_name: &str, purpose: &str) -> Span {
    tracing::info_span!("model.call", model.name = model_name, model.purpose = purpose)
}

/// Create a span for document ingestion into a collection
pub fn ingest_span(collection: &str) -> Span {
    tracing::info_span!("ingest", collection = collection, chunks = tracing::field::Empty)
}

/// Record the number of chunks written on the current ingest span
pub fn record_chunk_count(count: usize) {
    Span::current().record("chunks", count);
}
