//! Response synthesizer.
//!
//! Combines all task findings into one final answer with a single text
//! call. This is the one stage with an intentional silent fallback: the
//! raw material is already computed, so on call failure a deterministic
//! concatenation of the findings beats surfacing an error at the
//! pipeline's final step.

use tracing::{info, warn};

use super::prompt::{build_results_text, build_synthesis_prompt};
use crate::model::TaskResult;
use crate::provider::{Provider, system_message, user_message};

/// Max tokens for the synthesis call (longest response in the pipeline).
const SYNTHESIS_MAX_TOKENS: u32 = 2048;
/// Low temperature for consistent synthesis.
const SYNTHESIS_TEMPERATURE: f32 = 0.2;

/// Fixed answer when no task produced any results.
const NO_RESULTS_ANSWER: &str = "I couldn't find any relevant information to answer your query.";

/// Synthesizes task results into a final response.
pub struct ResponseSynthesizer {
    system_prompt: String,
}

impl ResponseSynthesizer {
    /// Creates a synthesizer with the given system prompt.
    #[must_use]
    pub const fn new(system_prompt: String) -> Self {
        Self { system_prompt }
    }

    /// Produces the final answer from all task results.
    ///
    /// Never fails: an empty result list yields a fixed message, and a
    /// provider failure falls back to concatenating each task's heading
    /// and analysis without a second call.
    pub async fn synthesize(
        &self,
        provider: &dyn Provider,
        original_query: &str,
        task_results: &[TaskResult],
    ) -> String {
        if task_results.is_empty() {
            warn!("no task results provided for synthesis");
            return NO_RESULTS_ANSWER.to_string();
        }

        info!(results = task_results.len(), "synthesizing final response");

        let results_text = build_results_text(task_results);
        let messages = vec![
            system_message(&self.system_prompt),
            user_message(&build_synthesis_prompt(original_query, &results_text)),
        ];

        match provider
            .process_text_messages(&messages, SYNTHESIS_MAX_TOKENS, SYNTHESIS_TEMPERATURE)
            .await
        {
            Ok(response) => response.trim().to_string(),
            Err(e) => {
                warn!(error = %e, "synthesis call failed, using fallback response");
                Self::fallback_response(original_query, task_results)
            }
        }
    }

    /// Deterministic concatenation of findings used when the synthesis
    /// call fails.
    fn fallback_response(original_query: &str, task_results: &[TaskResult]) -> String {
        let mut parts = vec![format!(
            "Based on my analysis of the documents, here's what I found regarding your query: {original_query}\n"
        )];

        for (i, result) in task_results.iter().enumerate() {
            parts.push(format!("**{}:**", result.task.name));
            parts.push(result.analysis.clone());
            if i + 1 < task_results.len() {
                parts.push(String::new());
            }
        }

        parts.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::model::AgentTask;
    use crate::provider::ChatMessage;
    use async_trait::async_trait;

    struct FailingProvider;

    #[async_trait]
    impl Provider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn process_text_messages(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, AgentError> {
            Err(AgentError::ApiRequest {
                message: "down".to_string(),
                status: Some(503),
            })
        }

        async fn process_multimodal_messages(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, AgentError> {
            Err(AgentError::ApiRequest {
                message: "down".to_string(),
                status: Some(503),
            })
        }
    }

    fn results() -> Vec<TaskResult> {
        vec![
            TaskResult {
                task: AgentTask::new("Revenue", "find revenue", "doc_1"),
                selected_pages: Vec::new(),
                analysis: "Revenue was $5M.".to_string(),
            },
            TaskResult {
                task: AgentTask::new("Expenses", "find expenses", "doc_1"),
                selected_pages: Vec::new(),
                analysis: "Expenses were $3M.".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn test_empty_results_fixed_answer() {
        let synthesizer = ResponseSynthesizer::new("synth".to_string());
        let answer = synthesizer.synthesize(&FailingProvider, "q", &[]).await;
        assert_eq!(answer, NO_RESULTS_ANSWER);
    }

    #[tokio::test]
    async fn test_call_failure_uses_fallback() {
        let synthesizer = ResponseSynthesizer::new("synth".to_string());
        let answer = synthesizer
            .synthesize(&FailingProvider, "What were the results?", &results())
            .await;
        assert!(answer.contains("What were the results?"));
        assert!(answer.contains("**Revenue:**"));
        assert!(answer.contains("Revenue was $5M."));
        assert!(answer.contains("**Expenses:**"));
    }

    #[test]
    fn test_fallback_layout() {
        let text = ResponseSynthesizer::fallback_response("q", &results());
        let revenue_pos = text.find("**Revenue:**").unwrap_or_default();
        let expenses_pos = text.find("**Expenses:**").unwrap_or_default();
        assert!(revenue_pos < expenses_pos);
    }
}
