//! Query reformulator.
//!
//! Rewrites the current query using conversation context so that pronouns
//! and references resolve to their subjects, without merging in earlier
//! questions or expanding scope.

use serde::Deserialize;
use tracing::info;

use super::parse::strip_code_fences;
use super::prompt::build_reformulation_prompt;
use crate::error::AgentError;
use crate::provider::{Provider, system_message, user_message};

/// Max tokens for the reformulation call.
const REFORMULATION_MAX_TOKENS: u32 = 1024;
/// Temperature for the reformulation call.
const REFORMULATION_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Deserialize)]
struct Reformulation {
    reformulated_query: String,
}

/// Reformulates queries by resolving references for better retrieval.
pub struct QueryReformulator {
    system_prompt: String,
}

impl QueryReformulator {
    /// Creates a reformulator with the given system prompt.
    #[must_use]
    pub const fn new(system_prompt: String) -> Self {
        Self { system_prompt }
    }

    /// Rewrites `current_query` using the condensed conversation context.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::QueryReformulation`] when the response is not
    /// valid JSON or lacks the `reformulated_query` key.
    pub async fn reformulate(
        &self,
        provider: &dyn Provider,
        current_query: &str,
        conversation_context: &str,
    ) -> Result<String, AgentError> {
        let messages = vec![
            system_message(&self.system_prompt),
            user_message(&build_reformulation_prompt(
                conversation_context,
                current_query,
            )),
        ];

        let response = provider
            .process_text_messages(&messages, REFORMULATION_MAX_TOKENS, REFORMULATION_TEMPERATURE)
            .await?;

        let reformulated = Self::parse(&response)?;
        info!(original = %current_query, reformulated = %reformulated, "query reformulated");
        Ok(reformulated)
    }

    fn parse(response: &str) -> Result<String, AgentError> {
        let parsed: Reformulation =
            serde_json::from_str(strip_code_fences(response)).map_err(|e| {
                AgentError::QueryReformulation {
                    message: format!("Invalid reformulation JSON: {e}"),
                    content: response.to_string(),
                }
            })?;
        Ok(parsed.reformulated_query)
    }
}
