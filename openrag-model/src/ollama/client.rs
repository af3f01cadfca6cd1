//! Ollama client implementation.

use super::config::OllamaConfig;
use super::convert::{self, ChatRequest, ChatResponse};
use crate::retry::{
    RetryConfig, execute_with_retry, is_retryable_model_error, is_retryable_status_code,
};
use async_stream::try_stream;
use async_trait::async_trait;
use futures::StreamExt;
use openrag_core::{Llm, LlmRequest, LlmResponseStream, OpenRagError};
use reqwest::Client;

/// Ollama chat model.
///
/// # Example
///
/// ```rust,ignore
/// use openrag_model::ollama::{OllamaConfig, OllamaModel};
///
/// let model = OllamaModel::new(OllamaConfig::new("llama3"))?;
/// ```
pub struct OllamaModel {
    client: Client,
    config: OllamaConfig,
    retry_config: RetryConfig,
}

impl OllamaModel {
    pub fn new(config: OllamaConfig) -> Result<Self, OpenRagError> {
        let client = Client::builder()
            .build()
            .map_err(|e| OpenRagError::Model(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config, retry_config: RetryConfig::default() })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry_config
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn api_url(&self) -> String {
        format!("{}/api/chat", self.config.effective_base_url().trim_end_matches('/'))
    }

    fn build_request(&self, request: &LlmRequest, stream: bool) -> ChatRequest {
        convert::build_chat_request(
            &self.config.model,
            request,
            stream,
            self.config.temperature,
            self.config.keep_alive.clone(),
        )
    }
}

fn parse_line(line: &str) -> Result<ChatResponse, OpenRagError> {
    let parsed: ChatResponse = serde_json::from_str(line)
        .map_err(|e| OpenRagError::Model(format!("Invalid Ollama response: {}", e)))?;
    if let Some(error) = &parsed.error {
        return Err(OpenRagError::Model(format!("Ollama error: {}", error)));
    }
    Ok(parsed)
}

#[async_trait]
impl Llm for OllamaModel {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate_content(
        &self,
        request: LlmRequest,
        stream: bool,
    ) -> Result<LlmResponseStream, OpenRagError> {
        let api_url = self.api_url();
        let chat_request = self.build_request(&request, stream);
        let client = self.client.clone();
        let retry_config = self.retry_config.clone();

        let response_stream = try_stream! {
            // Retries only cover request setup/execution. Stream failures after start are surfaced
            // directly and are not auto-replayed.
            let response = execute_with_retry(&retry_config, is_retryable_model_error, || {
                let client = client.clone();
                let api_url = api_url.clone();
                let chat_request = chat_request.clone();
                async move {
                    let response = client
                        .post(&api_url)
                        .json(&chat_request)
                        .send()
                        .await
                        .map_err(|e| OpenRagError::Model(format!("Ollama request failed: {}", e)))?;

                    if !response.status().is_success() {
                        let status = response.status();
                        let error_text = response.text().await.unwrap_or_default();
                        let retryability = if is_retryable_status_code(status.as_u16()) {
                            "retryable"
                        } else {
                            "non-retryable"
                        };
                        return Err(OpenRagError::Model(format!(
                            "Ollama API error ({}, {}): {}",
                            status, retryability, error_text
                        )));
                    }

                    Ok(response)
                }
            })
            .await?;

            if stream {
                // Newline-delimited JSON, one ChatResponse per line
                let mut byte_stream = response.bytes_stream();
                let mut buffer = String::new();

                while let Some(chunk) = byte_stream.next().await {
                    let chunk = chunk
                        .map_err(|e| OpenRagError::Model(format!("Stream read error: {}", e)))?;
                    buffer.push_str(&String::from_utf8_lossy(&chunk));

                    while let Some(line_end) = buffer.find('\n') {
                        let line = buffer[..line_end].trim().to_string();
                        buffer = buffer[line_end + 1..].to_string();
                        if line.is_empty() {
                            continue;
                        }
                        let parsed = parse_line(&line)?;
                        yield convert::chat_response_to_llm_response(&parsed, !parsed.done);
                    }
                }

                let rest = buffer.trim();
                if !rest.is_empty() {
                    let parsed = parse_line(rest)?;
                    yield convert::chat_response_to_llm_response(&parsed, !parsed.done);
                }
            } else {
                let body = response
                    .text()
                    .await
                    .map_err(|e| OpenRagError::Model(format!("Failed to read Ollama response: {}", e)))?;
                let parsed = parse_line(&body)?;
                yield convert::chat_response_to_llm_response(&parsed, false);
            }
        };

        Ok(Box::pin(response_stream))
    }
}
