use crate::{Result, types::Content};
use async_trait::async_trait;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;

pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmResponse>> + Send>>;

/// A chat-style language model.
///
/// Implementations return a stream of responses; non-streaming backends
/// yield a single complete response.
#[async_trait]
pub trait Llm: Send + Sync {
    fn name(&self) -> &str;
    async fn generate_content(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub config: Option<GenerateContentConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentConfig {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_schema: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Option<Content>,
    pub usage_metadata: Option<UsageMetadata>,
    pub finish_reason: Option<FinishReason>,
    pub partial: bool,
    pub turn_complete: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub prompt_token_count: i32,
    pub candidates_token_count: i32,
    pub total_token_count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    MaxTokens,
    Other,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self { model: model.into(), contents, config: None }
    }

    /// Single user-turn request carrying `prompt`.
    pub fn from_prompt(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(model, vec![Content::new("user").with_text(prompt)])
    }

    /// Set the response schema for structured output.
    pub fn with_response_schema(mut self, schema: serde_json::Value) -> Self {
        let config = self.config.get_or_insert_with(GenerateContentConfig::default);
        config.response_schema = Some(schema);
        self
    }

    /// Set the generation config.
    pub fn with_config(mut self, config: GenerateContentConfig) -> Self {
        self.config = Some(config);
        self
    }
}

impl LlmResponse {
    pub fn new(content: Content) -> Self {
        Self {
            content: Some(content),
            usage_metadata: None,
            finish_reason: Some(FinishReason::Stop),
            partial: false,
            turn_complete: true,
            error_code: None,
            error_message: None,
        }
    }

    /// Shorthand for a complete model turn holding `text`.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(Content::new("model").with_text(text))
    }
}

/// Drains a response stream and concatenates all text parts.
///
/// Partial (delta) responses and the final response are both appended, so
/// backends must not repeat streamed text in their closing response.
pub async fn collect_text(mut stream: LlmResponseStream) -> Result<String> {
    let mut text = String::new();
    while let Some(response) = stream.next().await {
        let response = response?;
        if let Some(content) = &response.content {
            for part in &content.parts {
                if let Some(t) = part.text() {
                    text.push_str(t);
                }
            }
        }
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_request_creation() {
        let req = LlmRequest::new("test-model", vec![]);
        assert_eq!(req.model, "test-model");
        assert!(req.contents.is_empty());
    }

    #[test]
    fn test_llm_request_from_prompt() {
        let req = LlmRequest::from_prompt("m", "rephrase this");
        assert_eq!(req.contents.len(), 1);
        assert_eq!(req.contents[0].role, "user");
        assert_eq!(req.contents[0].text(), "rephrase this");
    }

    #[test]
    fn test_llm_request_with_response_schema() {
        let schema = serde_json::json!({
            "type": "object",
            "properties": { "related": { "type": "boolean" } }
        });
        let req = LlmRequest::new("test-model", vec![]).with_response_schema(schema.clone());

        let config = req.config.expect("config should be set");
        assert_eq!(config.response_schema, Some(schema));
    }

    #[test]
    fn test_llm_response_creation() {
        let resp = LlmResponse::text("hello");
        assert!(resp.turn_complete);
        assert!(!resp.partial);
        assert_eq!(resp.finish_reason, Some(FinishReason::Stop));
    }

    #[tokio::test]
    async fn test_collect_text_joins_stream() {
        let stream: LlmResponseStream = Box::pin(async_stream::stream! {
            yield Ok(LlmResponse::text("{\"related\": "));
            yield Ok(LlmResponse::text("true}"));
        });
        let text = collect_text(stream).await.unwrap();
        assert_eq!(text, "{\"related\": true}");
    }

    #[tokio::test]
    async fn test_collect_text_propagates_errors() {
        let stream: LlmResponseStream = Box::pin(async_stream::stream! {
            yield Ok(LlmResponse::text("partial"));
            yield Err(crate::OpenRagError::Model("stream reset".to_string()));
        });
        assert!(collect_text(stream).await.is_err());
    }
}
