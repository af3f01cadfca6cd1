//! Error types for the RAG crate.

/// Errors produced by loading, indexing and retrieval.
#[derive(Debug, thiserror::Error)]
pub enum RagError {
    /// A registry lookup received a name it does not know.
    #[error("{kind} '{name}' is not supported. We currently support: {supported}")]
    UnsupportedProvider { kind: &'static str, name: String, supported: String },

    /// The name is known but its backend was compiled out.
    #[error("{kind} '{name}' requires the `{feature}` cargo feature")]
    FeatureDisabled { kind: &'static str, name: String, feature: &'static str },

    /// Query rephrasing failed on every attempt.
    #[error("query rephrasing failed after {attempts} attempt(s): {reason}")]
    RephraseFailed { attempts: u32, reason: String },

    /// Relevance classification of one candidate failed on every attempt.
    #[error("relevance classification failed after {attempts} attempt(s): {reason}")]
    ClassifyFailed { attempts: u32, reason: String },

    /// The re-ranker returned output without a well-formed `results` entry.
    #[error("malformed re-ranker output: {0}")]
    MalformedRerankerOutput(String),

    #[error("embedding error ({provider}): {message}")]
    EmbeddingError { provider: String, message: String },

    #[error("vector store error ({backend}): {message}")]
    VectorStoreError { backend: String, message: String },

    #[error("re-ranker error ({reranker}): {message}")]
    RerankerError { reranker: String, message: String },

    #[error("unsupported file format '{extension}' for {path}. Supported extensions: {supported}")]
    UnsupportedFormat { path: String, extension: String, supported: String },

    #[error("failed to load {source_name}: {message}")]
    LoaderError { source_name: String, message: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] openrag_core::OpenRagError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    pub(crate) fn unsupported(kind: &'static str, name: &str, supported: &[&str]) -> Self {
        RagError::UnsupportedProvider {
            kind,
            name: name.to_string(),
            supported: supported.join(", "),
        }
    }
}
