//! Query classifier.
//!
//! Decides whether a query needs document retrieval at all. This is a hard
//! gate: a negative classification makes the orchestrator skip storage and
//! the entire task pipeline, returning a direct answer immediately.

use serde::Deserialize;
use tracing::info;

use super::parse::strip_code_fences;
use super::prompt::build_classification_prompt;
use crate::error::AgentError;
use crate::provider::{Provider, system_message, user_message};

/// Max tokens for the classification call.
const CLASSIFICATION_MAX_TOKENS: u32 = 450;
/// Temperature for the classification call.
const CLASSIFICATION_TEMPERATURE: f32 = 0.1;

/// Result of classifying a query.
#[derive(Debug, Clone, Deserialize)]
pub struct Classification {
    /// Why the query does or does not need documents.
    pub reasoning: String,
    /// Whether document retrieval is required.
    pub needs_documents: bool,
}

/// Classifies queries to determine the processing strategy.
pub struct QueryClassifier {
    system_prompt: String,
}

impl QueryClassifier {
    /// Creates a classifier with the given system prompt.
    #[must_use]
    pub const fn new(system_prompt: String) -> Self {
        Self { system_prompt }
    }

    /// Classifies a query.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::QueryClassification`] when the response is not
    /// valid JSON or is missing a required key. No fallback is attempted.
    pub async fn classify(
        &self,
        provider: &dyn Provider,
        query: &str,
    ) -> Result<Classification, AgentError> {
        let messages = vec![
            system_message(&self.system_prompt),
            user_message(&build_classification_prompt(query)),
        ];

        let response = provider
            .process_text_messages(&messages, CLASSIFICATION_MAX_TOKENS, CLASSIFICATION_TEMPERATURE)
            .await?;

        let classification = Self::parse(&response)?;
        info!(
            needs_documents = classification.needs_documents,
            reasoning = %classification.reasoning,
            "query classified"
        );
        Ok(classification)
    }

    fn parse(response: &str) -> Result<Classification, AgentError> {
        serde_json::from_str(strip_code_fences(response)).map_err(|e| {
            AgentError::QueryClassification {
                message: format!("Invalid classification JSON: {e}"),
                content: response.to_string(),
            }
        })
    }
}
