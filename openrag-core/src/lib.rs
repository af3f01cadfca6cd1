//! # openrag-core
//!
//! Core traits and types shared by the OpenRAG crates.
//!
//! ## Overview
//!
//! - [`Llm`] - The language model interface used by the rephraser and classifier
//! - [`Content`] / [`Part`] - Messages exchanged with a model
//! - [`PromptTemplate`] - `{placeholder}` prompt rendering
//! - [`OpenRagError`] / [`Result`] - Unified error handling
//!
//! ## Quick Start
//!
//! ```rust
//! use openrag_core::PromptTemplate;
//! use std::collections::HashMap;
//!
//! let template = PromptTemplate::new("Rephrase: {query}");
//! let prompt = template.render(&HashMap::from([("query", "what is RAG?")])).unwrap();
//! assert_eq!(prompt, "Rephrase: what is RAG?");
//! ```

pub mod error;
pub mod model;
pub mod prompt;
pub mod types;

pub use error::{OpenRagError, Result};
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata, collect_text,
};
pub use prompt::PromptTemplate;
pub use types::{Content, Part};
