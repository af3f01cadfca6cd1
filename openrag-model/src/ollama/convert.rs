//! Wire types for the Ollama chat API and conversions from core types.

use openrag_core::{Content, FinishReason, LlmRequest, LlmResponse, UsageMetadata};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<ChatOptions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// One line of an Ollama chat response (the whole body when not streaming).
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub message: Option<ChatMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    #[serde(default)]
    pub prompt_eval_count: Option<i32>,
    #[serde(default)]
    pub eval_count: Option<i32>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Convert core Content to an Ollama chat message.
pub fn content_to_message(content: &Content) -> ChatMessage {
    let role = match content.role.as_str() {
        "model" | "assistant" => "assistant",
        "system" => "system",
        _ => "user",
    };
    ChatMessage { role: role.to_string(), content: content.text() }
}

pub fn build_chat_request(
    model: &str,
    request: &LlmRequest,
    stream: bool,
    default_temperature: Option<f32>,
    keep_alive: Option<String>,
) -> ChatRequest {
    let config = request.config.as_ref();
    let options = ChatOptions {
        temperature: config.and_then(|c| c.temperature).or(default_temperature),
        top_p: config.and_then(|c| c.top_p),
        num_predict: config.and_then(|c| c.max_output_tokens),
    };

    ChatRequest {
        model: model.to_string(),
        messages: request.contents.iter().map(content_to_message).collect(),
        stream,
        format: config.and_then(|c| c.response_schema.clone()),
        options: Some(options),
        keep_alive,
    }
}

/// Convert an Ollama chat response to a core LlmResponse.
pub fn chat_response_to_llm_response(response: &ChatResponse, partial: bool) -> LlmResponse {
    let content = response
        .message
        .as_ref()
        .filter(|m| !m.content.is_empty())
        .map(|m| Content::new("model").with_text(m.content.clone()));

    let finish_reason = if response.done {
        match response.done_reason.as_deref() {
            Some("length") => Some(FinishReason::MaxTokens),
            Some("stop") | None => Some(FinishReason::Stop),
            Some(_) => Some(FinishReason::Other),
        }
    } else {
        None
    };

    let usage_metadata = match (response.prompt_eval_count, response.eval_count) {
        (Some(prompt), Some(eval)) => Some(UsageMetadata {
            prompt_token_count: prompt,
            candidates_token_count: eval,
            total_token_count: prompt + eval,
        }),
        _ => None,
    };

    LlmResponse {
        content,
        usage_metadata,
        finish_reason,
        partial,
        turn_complete: response.done,
        error_code: None,
        error_message: response.error.clone(),
    }
}

#[cfg(test)]
mod tests {
    use openrag_core::GenerateContentConfig;

    use super::*;

    #[test]
    fn request_carries_schema_as_format() {
        let schema = serde_json::json!({ "type": "object" });
        let request = LlmRequest::from_prompt("llama3", "hi").with_response_schema(schema.clone());
        let chat = build_chat_request("llama3", &request, false, Some(0.0), None);

        assert_eq!(chat.format, Some(schema));
        assert_eq!(chat.messages.len(), 1);
        assert_eq!(chat.messages[0].role, "user");
        assert_eq!(chat.options.and_then(|o| o.temperature), Some(0.0));
    }

    #[test]
    fn sampling_settings_become_options() {
        let config = GenerateContentConfig {
            temperature: Some(0.4),
            top_p: Some(0.9),
            max_output_tokens: Some(128),
            response_schema: None,
        };
        let request = LlmRequest::from_prompt("llama3", "hi").with_config(config);
        let options = build_chat_request("llama3", &request, false, Some(0.0), None).options.unwrap();

        assert_eq!(options.temperature, Some(0.4));
        assert_eq!(options.top_p, Some(0.9));
        assert_eq!(options.num_predict, Some(128));
    }

    #[test]
    fn final_response_maps_usage_and_finish_reason() {
        let response: ChatResponse = serde_json::from_value(serde_json::json!({
            "model": "llama3",
            "message": { "role": "assistant", "content": "{\"related\": true}" },
            "done": true,
            "done_reason": "stop",
            "prompt_eval_count": 12,
            "eval_count": 5
        }))
        .unwrap();

        let converted = chat_response_to_llm_response(&response, false);
        assert_eq!(converted.finish_reason, Some(FinishReason::Stop));
        assert_eq!(converted.usage_metadata.map(|u| u.total_token_count), Some(17));
        assert_eq!(converted.content.map(|c| c.text()), Some("{\"related\": true}".to_string()));
    }
}
