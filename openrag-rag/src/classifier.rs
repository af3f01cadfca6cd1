//! Binary relevance judgments through a language model.

use std::collections::HashMap;
use std::sync::Arc;

use openrag_core::{GenerateContentConfig, Llm, PromptTemplate};
use openrag_model::RetryConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::PromptConfig;
use crate::error::{RagError, Result};
use crate::structured::{format_instructions, generate_structured, schema_of};

/// Whether a piece of content can answer a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ClassificationLabel {
    /// Can the content be used to answer the question or not?
    pub related: bool,
}

/// Asks the model, one call per candidate, whether the candidate is
/// relevant to a query.
///
/// Output that never parses is an error, not a `false`.
pub struct RelevanceClassifier {
    llm: Arc<dyn Llm>,
    template: PromptTemplate,
    instructions: String,
    generation: GenerateContentConfig,
    retry: RetryConfig,
}

impl RelevanceClassifier {
    pub fn new(llm: Arc<dyn Llm>, prompts: &PromptConfig) -> Result<Self> {
        Ok(Self {
            llm,
            template: prompts.classifier_template()?,
            instructions: format_instructions(&schema_of::<ClassificationLabel>()),
            generation: GenerateContentConfig::default(),
            retry: RetryConfig::default().with_max_retries(2),
        })
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sampling settings sent with every request.
    #[must_use]
    pub fn with_generation_config(mut self, generation: GenerateContentConfig) -> Self {
        self.generation = generation;
        self
    }

    pub fn render_prompt(&self, query: &str, content: &str) -> Result<String> {
        let values = HashMap::from([
            ("question", query),
            ("content", content),
            ("format_instructions", self.instructions.as_str()),
        ]);
        Ok(self.template.render(&values)?)
    }

    pub async fn classify(&self, query: &str, content: &str) -> Result<bool> {
        let prompt = self.render_prompt(query, content)?;
        generate_structured::<ClassificationLabel, _>(
            &self.llm,
            "classify",
            prompt,
            &self.generation,
            &self.retry,
            Ok,
        )
            .await
            .map(|label| label.related)
            .map_err(|failure| RagError::ClassifyFailed {
                attempts: failure.attempts,
                reason: failure.error.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use openrag_model::MockLlm;

    fn classifier(mock: Arc<MockLlm>) -> RelevanceClassifier {
        RelevanceClassifier::new(mock, &PromptConfig::default())
            .unwrap()
            .with_retry_config(
                RetryConfig::default()
                    .with_max_retries(2)
                    .with_initial_delay(Duration::ZERO)
                    .with_max_delay(Duration::ZERO),
            )
    }

    #[tokio::test]
    async fn well_formed_output_is_a_bool() {
        let mock = Arc::new(
            MockLlm::new("m").with_response(r#"{"related": true}"#).with_response(r#"{"related": false}"#),
        );
        let classifier = classifier(mock.clone());

        assert!(classifier.classify("cats", "A is about cats").await.unwrap());
        assert!(!classifier.classify("cats", "B is about dogs").await.unwrap());

        let prompt = mock.requests()[1].contents[0].text();
        assert!(prompt.contains("content: B is about dogs"));
        assert!(prompt.contains("question: cats"));
        assert!(prompt.contains("\"related\""));
    }

    #[tokio::test]
    async fn unparsable_output_is_never_false() {
        let mock = Arc::new(MockLlm::new("m").with_response("maybe?"));
        let err = classifier(mock.clone()).classify("cats", "text").await.unwrap_err();
        assert!(matches!(err, RagError::ClassifyFailed { attempts: 3, .. }), "{err}");
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn transient_model_errors_are_retried() {
        let mock = Arc::new(
            MockLlm::new("m")
                .with_error("Ollama API error (503 Service Unavailable, retryable): loading")
                .with_response(r#"Sure: {"related": true}"#),
        );
        assert!(classifier(mock.clone()).classify("cats", "text").await.unwrap());
        assert_eq!(mock.call_count(), 2);
    }
}
