//! # openrag-model
//!
//! Language model integrations for OpenRAG.
//!
//! ## Overview
//!
//! - [`OllamaModel`] - Chat models served by Ollama
//! - [`MockLlm`] - Scripted model for tests
//! - [`RetryConfig`] / [`execute_with_retry`] - Bounded retry with exponential backoff
//! - [`resolve_llm`] - Build a model from a provider name
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use openrag_model::resolve_llm;
//!
//! let model = resolve_llm("ollama", Some("llama3")).unwrap();
//! ```

pub mod mock;
pub mod ollama;
pub mod registry;
pub mod retry;

pub use mock::MockLlm;
pub use ollama::{OllamaConfig, OllamaModel};
pub use registry::{LlmProvider, LlmSettings, resolve_llm, resolve_llm_with};
pub use retry::{
    RetryConfig, execute_with_retry, is_retryable_error_message, is_retryable_model_error,
    is_retryable_status_code,
};
