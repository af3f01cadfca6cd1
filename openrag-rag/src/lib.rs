//! # openrag-rag
//!
//! Document indexing and multi-strategy retrieval.
//!
//! Documents come in through a [`DocumentLoader`], are split by a
//! [`Chunker`], embedded by an [`EmbeddingProvider`] and stored in a
//! [`VectorStore`] by the [`RagPipeline`]. A [`Retriever`] answers queries
//! over the resulting [`VectorIndex`] with one of four strategies: naive
//! similarity search, re-ranked search, re-ranked search over rephrased
//! queries, and re-ranked search over candidates a language model judged
//! relevant.
//!
//! Every backend is chosen by name through a registry
//! ([`resolve_embedding_provider`], [`resolve_vector_store`],
//! [`resolve_chunker`], [`resolve_reranker`]); [`RagSystem`] resolves all of
//! them from a [`RagConfig`].
//!
//! ## Features
//!
//! The default feature set is fully usable offline with the `hashing`
//! embedding provider, the in-memory store and the `term-overlap` re-ranker.
//!
//! | Feature      | What it enables                                         |
//! |--------------|---------------------------------------------------------|
//! | `fastembed`  | `FastEmbedProvider` and `FastEmbedReranker` (local ONNX) |
//! | `surrealdb`  | `SurrealVectorStore` via surrealdb                      |
//! | `qdrant`     | `QdrantVectorStore` on a Qdrant server                  |
//! | `full`       | All of the above                                        |

pub mod chunking;
pub mod classifier;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod loader;
mod pages;
pub mod pipeline;
pub mod rephraser;
pub mod reranker;
pub mod retriever;
pub mod structured;
pub mod system;
pub mod vectorstore;

#[cfg(feature = "surrealdb")]
pub mod surrealdb;

#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use chunking::{
    CharacterChunker, Chunker, ChunkerKind, HtmlHeaderChunker, MarkdownHeaderChunker,
    RecursiveChunker, SentenceChunker, resolve_chunker,
};
pub use classifier::{ClassificationLabel, RelevanceClassifier};
pub use config::{PromptConfig, RagConfig, RagConfigBuilder, RetrievalConfig};
pub use document::{Chunk, Document, Filter, SearchResult};
pub use embedding::{
    EmbeddingProvider, EmbeddingProviderKind, HashingEmbedding, resolve_embedding_provider,
};
pub use error::{RagError, Result};
pub use index::{CollectionIndex, VectorIndex};
pub use inmemory::InMemoryVectorStore;
pub use loader::DocumentLoader;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use rephraser::{QueryRephraser, RephrasedQuerySet};
pub use reranker::{
    HttpReranker, RankedResult, Reranker, RerankerKind, TermOverlapReranker, resolve_reranker,
};
pub use retriever::{RetrievalStrategy, Retriever};
pub use system::RagSystem;
pub use vectorstore::{VectorStore, VectorStoreKind, resolve_vector_store};
