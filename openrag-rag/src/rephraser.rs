//! Query expansion through a language model.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use openrag_core::{GenerateContentConfig, Llm, PromptTemplate};
use openrag_model::RetryConfig;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::PromptConfig;
use crate::error::{RagError, Result};
use crate::structured::{format_instructions, generate_structured, schema_of};

/// Number of phrasings a rephrase produces.
pub const REPHRASE_COUNT: usize = 4;

/// A list of rephrased queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RephrasedQuerySet {
    /// Exactly four distinct, non-empty rephrasings of the query.
    pub rephrased_queries: Vec<String>,
}

impl RephrasedQuerySet {
    /// Trims every phrasing and checks the set is four distinct non-empty
    /// strings.
    fn validated(mut self) -> std::result::Result<Self, String> {
        for query in &mut self.rephrased_queries {
            *query = query.trim().to_string();
        }
        let queries = &self.rephrased_queries;
        if queries.len() != REPHRASE_COUNT {
            return Err(format!("expected {REPHRASE_COUNT} rephrased queries, got {}", queries.len()));
        }
        if queries.iter().any(String::is_empty) {
            return Err("rephrased queries must not be empty".to_string());
        }
        let distinct: HashSet<&str> = queries.iter().map(String::as_str).collect();
        if distinct.len() != queries.len() {
            return Err("rephrased queries must be distinct".to_string());
        }
        Ok(self)
    }

    pub fn into_queries(self) -> Vec<String> {
        self.rephrased_queries
    }
}

/// Expands a query into [`REPHRASE_COUNT`] alternative phrasings.
///
/// Never falls back on its own: when every attempt fails the caller gets
/// [`RagError::RephraseFailed`] and decides what to do.
pub struct QueryRephraser {
    llm: Arc<dyn Llm>,
    template: PromptTemplate,
    instructions: String,
    generation: GenerateContentConfig,
    retry: RetryConfig,
}

impl QueryRephraser {
    /// Uses the prompt from `prompts` and two retries.
    pub fn new(llm: Arc<dyn Llm>, prompts: &PromptConfig) -> Result<Self> {
        Ok(Self {
            llm,
            template: prompts.rephrasing_template()?,
            instructions: format_instructions(&schema_of::<RephrasedQuerySet>()),
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

    pub fn render_prompt(&self, query: &str) -> Result<String> {
        let values =
            HashMap::from([("query", query), ("format_instructions", self.instructions.as_str())]);
        Ok(self.template.render(&values)?)
    }

    pub async fn rephrase(&self, query: &str) -> Result<RephrasedQuerySet> {
        let prompt = self.render_prompt(query)?;
        let result = generate_structured(
            &self.llm,
            "rephrase",
            prompt,
            &self.generation,
            &self.retry,
            RephrasedQuerySet::validated,
        )
        .await;

        match result {
            Ok(set) => {
                tracing::debug!(query, variants = ?set.rephrased_queries, "rephrased query");
                Ok(set)
            }
            Err(failure) => Err(RagError::RephraseFailed {
                attempts: failure.attempts,
                reason: failure.error.to_string(),
            }),
        }
    }
}
