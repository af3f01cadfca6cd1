//! Ollama chat provider.
//!
//! Talks to a local or remote [Ollama](https://ollama.com) server over its
//! `/api/chat` HTTP endpoint. Structured output requests forward the
//! response schema through Ollama's `format` field.

mod client;
mod config;
mod convert;

pub use client::OllamaModel;
pub use config::{OLLAMA_API_BASE, OllamaConfig};
