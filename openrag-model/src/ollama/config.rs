//! Configuration types for the Ollama provider.

use serde::{Deserialize, Serialize};

/// Default Ollama server URL.
pub const OLLAMA_API_BASE: &str = "http://localhost:11434";

/// Default chat model when none is configured.
pub const DEFAULT_OLLAMA_MODEL: &str = "llama3";

/// Configuration for an Ollama chat model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Model name, e.g. `llama3` or `mistral:7b`.
    pub model: String,
    /// Optional custom base URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Sampling temperature. Structured output is most reliable near 0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// How long the server keeps the model loaded, e.g. `5m`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            base_url: None,
            temperature: Some(0.0),
            keep_alive: None,
        }
    }
}

impl OllamaConfig {
    pub fn default_model() -> &'static str {
        DEFAULT_OLLAMA_MODEL
    }

    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), ..Default::default() }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Get the effective base URL.
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(OLLAMA_API_BASE)
    }
}
