//! JSON-structured model calls with bounded retries.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use openrag_core::{GenerateContentConfig, Llm, LlmRequest, OpenRagError, collect_text};
use openrag_model::{RetryConfig, execute_with_retry, is_retryable_model_error};
use openrag_telemetry::{Instrument, model_call_span};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;

/// Why one structured attempt failed.
#[derive(Debug, thiserror::Error)]
pub enum StructuredOutputError {
    #[error(transparent)]
    Model(#[from] OpenRagError),
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
    #[error("model returned an empty response")]
    EmptyResponse,
    #[error("could not parse model output: {0}")]
    Parse(String),
    #[error("model output violates the expected shape: {0}")]
    Contract(String),
}

impl StructuredOutputError {
    /// Every failure is worth another attempt except a model error that the
    /// transport layer already classified as permanent.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Model(error) => is_retryable_model_error(error),
            _ => true,
        }
    }
}

/// Result of [`generate_structured`] once all attempts are spent.
#[derive(Debug)]
pub struct StructuredFailure {
    pub attempts: u32,
    pub error: StructuredOutputError,
}

/// JSON schema of `T`, as attached to requests and format instructions.
pub fn schema_of<T: JsonSchema>() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(T)).unwrap_or_default()
}

/// Prompt text asking the model to answer with an instance of `schema`.
pub fn format_instructions(schema: &serde_json::Value) -> String {
    let schema = serde_json::to_string(schema).unwrap_or_default();
    format!(
        "The output should be formatted as a JSON instance that conforms to the JSON schema below.\n\
         Return only the JSON object, with no commentary.\n\n\
         Here is the output schema:\n```\n{schema}\n```"
    )
}

/// Pulls the JSON object out of a model reply that may wrap it in a code
/// fence or surround it with prose.
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    (start <= end).then(|| &unfenced[start..=end])
}

/// Parses a reply into `T`.
pub fn parse_reply<T: DeserializeOwned>(raw: &str) -> Result<T, StructuredOutputError> {
    if raw.trim().is_empty() {
        return Err(StructuredOutputError::EmptyResponse);
    }
    let json = extract_json(raw)
        .ok_or_else(|| StructuredOutputError::Parse("no JSON object in response".to_string()))?;
    serde_json::from_str(json).map_err(|e| StructuredOutputError::Parse(e.to_string()))
}

/// Sends `prompt` to `llm` until the reply parses into `T` and passes
/// `validate`, or the retry budget runs out.
///
/// `generation` carries the sampling settings; the response schema of `T`
/// is added to it. Each attempt is bounded by `retry.attempt_timeout` when set.
pub async fn generate_structured<T, V>(
    llm: &Arc<dyn Llm>,
    purpose: &str,
    prompt: String,
    generation: &GenerateContentConfig,
    retry: &RetryConfig,
    validate: V,
) -> Result<T, StructuredFailure>
where
    T: DeserializeOwned + JsonSchema,
    V: Fn(T) -> Result<T, String>,
{
    let request = LlmRequest::from_prompt(llm.name(), prompt)
        .with_config(generation.clone())
        .with_response_schema(schema_of::<T>());
    let attempts = AtomicU32::new(0);
    let timeout = retry.attempt_timeout;
    let validate = &validate;

    let outcome = execute_with_retry(retry, StructuredOutputError::is_retryable, || {
        attempts.fetch_add(1, Ordering::SeqCst);
        let llm = Arc::clone(llm);
        let request = request.clone();
        let span = model_call_span(llm.name(), purpose);
        async move {
            let call = async {
                let stream = llm.generate_content(request, false).await?;
                Ok::<String, OpenRagError>(collect_text(stream).await?)
            };
            let text = match timeout {
                Some(limit) => tokio::time::timeout(limit, call)
                    .await
                    .map_err(|_| StructuredOutputError::Timeout(limit))??,
                None => call.await?,
            };
            let parsed: T = parse_reply(&text)?;
            validate(parsed).map_err(StructuredOutputError::Contract)
        }
        .instrument(span)
    })
    .await;

    outcome.map_err(|error| StructuredFailure { attempts: attempts.load(Ordering::SeqCst), error })
}
