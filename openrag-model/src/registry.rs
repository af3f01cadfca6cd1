//! Name-based resolution of chat model providers.

use crate::ollama::{OllamaConfig, OllamaModel};
use crate::retry::RetryConfig;
use openrag_core::{Llm, OpenRagError, Result};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Chat model providers known to [`resolve_llm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
}

impl LlmProvider {
    pub const ALL: &'static [LlmProvider] = &[LlmProvider::Ollama];

    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => "ollama",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            LlmProvider::Ollama => crate::ollama::OllamaConfig::default_model(),
        }
    }

    fn supported() -> String {
        Self::ALL.iter().map(|p| p.as_str()).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = OpenRagError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL.iter().copied().find(|p| p.as_str().eq_ignore_ascii_case(s.trim())).ok_or_else(
            || OpenRagError::UnsupportedProvider {
                kind: "LLM provider",
                name: s.to_string(),
                supported: Self::supported(),
            },
        )
    }
}

/// Settings for building a chat model by provider name.
#[derive(Debug, Clone, Default)]
pub struct LlmSettings {
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub retry: Option<RetryConfig>,
}

/// Build a chat model from a provider name and optional model name.
///
/// # Errors
///
/// [`OpenRagError::UnsupportedProvider`] when `provider` is not one of
/// [`LlmProvider::ALL`].
pub fn resolve_llm(provider: &str, model: Option<&str>) -> Result<Arc<dyn Llm>> {
    resolve_llm_with(
        provider,
        LlmSettings { model: model.map(str::to_string), ..LlmSettings::default() },
    )
}

pub fn resolve_llm_with(provider: &str, settings: LlmSettings) -> Result<Arc<dyn Llm>> {
    let provider: LlmProvider = provider.parse()?;
    let model_name = settings.model.unwrap_or_else(|| provider.default_model().to_string());

    match provider {
        LlmProvider::Ollama => {
            let mut config = OllamaConfig::new(model_name);
            if let Some(base_url) = settings.base_url {
                config = config.with_base_url(base_url);
            }
            let mut model = OllamaModel::new(config)?;
            if let Some(retry) = settings.retry {
                model = model.with_retry_config(retry);
            }
            tracing::debug!(provider = %provider, model = model.name(), "resolved chat model");
            Ok(Arc::new(model))
        }
    }
}
