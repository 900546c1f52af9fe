//! Conversation context processor.
//!
//! Compresses long conversation histories into a bounded context string.
//! Short conversations pass through unchanged; once the turn count exceeds
//! the configured threshold, the oldest turns are folded into a one-call
//! summary and only the most recent turns stay verbatim.

use tracing::info;

use super::prompt::build_summarization_prompt;
use crate::error::AgentError;
use crate::model::{ConversationMessage, MessageRole};
use crate::provider::{Provider, system_message, user_message};

/// Max tokens for the summarization call.
const SUMMARY_MAX_TOKENS: u32 = 500;
/// Temperature for the summarization call.
const SUMMARY_TEMPERATURE: f32 = 0.3;

/// Output of context processing: the condensed context string and the
/// messages a UI should display in place of the full history.
#[derive(Debug, Clone)]
pub struct ProcessedContext {
    /// Condensed context handed to reformulation and later stages.
    pub context: String,
    /// Messages for display: either the original history unchanged, or a
    /// synthetic summary message followed by the recent verbatim turns.
    pub display_messages: Vec<ConversationMessage>,
}

/// Processes conversation history into an optimized context for retrieval.
///
/// A turn is one user message plus its assistant reply; turns are counted
/// by user messages only.
pub struct ContextProcessor {
    max_turns_before_summary: usize,
    turns_to_summarize: usize,
    turns_to_keep_full: usize,
    system_prompt: String,
}

impl ContextProcessor {
    /// Creates a processor with the given thresholds and summarizer prompt.
    #[must_use]
    pub const fn new(
        max_turns_before_summary: usize,
        turns_to_summarize: usize,
        turns_to_keep_full: usize,
        system_prompt: String,
    ) -> Self {
        Self {
            max_turns_before_summary,
            turns_to_summarize,
            turns_to_keep_full,
            system_prompt,
        }
    }

    /// Processes the conversation history against the current query.
    ///
    /// Identical inputs with a deterministic provider produce identical
    /// output; the processor holds no state between calls.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ContextProcessing`] when summarization fails.
    /// There is no fallback — downstream stages assume a valid context.
    pub async fn process(
        &self,
        provider: &dyn Provider,
        messages: &[ConversationMessage],
        current_query: &str,
    ) -> Result<ProcessedContext, AgentError> {
        let turns = Self::count_turns(messages);

        if turns <= self.max_turns_before_summary {
            return Ok(ProcessedContext {
                context: Self::format_messages(messages),
                display_messages: messages.to_vec(),
            });
        }

        info!(turns, "conversation exceeds turn threshold, summarizing");

        let (to_summarize, to_keep) = self.split_for_summary(messages);
        let summary = self.summarize_chunk(provider, to_summarize).await?;

        let mut context_parts = vec![format!("Previous Conversation Summary:\n{summary}\n")];
        if !to_keep.is_empty() {
            context_parts.push("Recent Conversation:".to_string());
            context_parts.push(Self::format_messages(to_keep));
        }
        context_parts.push(format!("\nCurrent Query: {current_query}"));

        let summary_message = ConversationMessage::system(format!(
            "[Conversation Summary of First {} Turns]\n{summary}",
            self.turns_to_summarize
        ));
        let mut display_messages = Vec::with_capacity(to_keep.len() + 1);
        display_messages.push(summary_message);
        display_messages.extend_from_slice(to_keep);

        Ok(ProcessedContext {
            context: context_parts.join("\n"),
            display_messages,
        })
    }

    /// Counts conversation turns (user messages only).
    fn count_turns(messages: &[ConversationMessage]) -> usize {
        messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .count()
    }

    /// Splits the log at the boundary after the Nth user/assistant pair,
    /// then caps the kept tail at `turns_to_keep_full` turns.
    fn split_for_summary<'a>(
        &self,
        messages: &'a [ConversationMessage],
    ) -> (&'a [ConversationMessage], &'a [ConversationMessage]) {
        let mut turn_count = 0;
        let mut split_index = 0;

        let mut i = 0;
        while i < messages.len() {
            if i + 1 < messages.len() && messages[i].role == MessageRole::User {
                turn_count += 1;
                if turn_count == self.turns_to_summarize {
                    split_index = i + 2; // include the assistant reply
                    break;
                }
            }
            i += 2;
        }

        let (to_summarize, mut to_keep) = messages.split_at(split_index);

        if self.turns_to_keep_full > 0 {
            let max_messages = self.turns_to_keep_full * 2;
            if to_keep.len() > max_messages {
                to_keep = &to_keep[to_keep.len() - max_messages..];
            }
        }

        (to_summarize, to_keep)
    }

    /// Formats messages as readable context text.
    fn format_messages(messages: &[ConversationMessage]) -> String {
        messages
            .iter()
            .map(|m| {
                let role = if m.role == MessageRole::User {
                    "User"
                } else {
                    "Assistant"
                };
                format!("{role}: {}", m.content)
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    async fn summarize_chunk(
        &self,
        provider: &dyn Provider,
        messages: &[ConversationMessage],
    ) -> Result<String, AgentError> {
        let conversation_text = Self::format_messages(messages);
        let api_messages = vec![
            system_message(&self.system_prompt),
            user_message(&build_summarization_prompt(&conversation_text)),
        ];

        let summary = provider
            .process_text_messages(&api_messages, SUMMARY_MAX_TOKENS, SUMMARY_TEMPERATURE)
            .await
            .map_err(|e| AgentError::ContextProcessing {
                message: format!("Failed to summarize conversation: {e}"),
            })?;

        Ok(summary.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ChatMessage;
    use async_trait::async_trait;

    struct FixedSummaryProvider;

    #[async_trait]
    impl Provider for FixedSummaryProvider {
        fn name(&self) -> &'static str {
            "stub"
        }

        async fn process_text_messages(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, AgentError> {
            Ok("the user asked about revenue".to_string())
        }

        async fn process_multimodal_messages(
            &self,
            _messages: &[ChatMessage],
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String, AgentError> {
            Ok(String::new())
        }
    }

    fn history(turns: usize) -> Vec<ConversationMessage> {
        let mut messages = Vec::new();
        for i in 0..turns {
            messages.push(ConversationMessage::user(format!("question {i}")));
            messages.push(ConversationMessage::assistant(format!("answer {i}")));
        }
        messages
    }

    fn processor() -> ContextProcessor {
        ContextProcessor::new(8, 5, 3, "summarize".to_string())
    }

    #[tokio::test]
    async fn test_short_history_passes_through() {
        let messages = history(3);
        let processed = processor()
            .process(&FixedSummaryProvider, &messages, "next question")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(processed.display_messages.len(), 6);
        assert!(processed.context.contains("User: question 0"));
        assert!(processed.context.contains("Assistant: answer 2"));
        assert!(!processed.context.contains("Summary"));
    }

    #[tokio::test]
    async fn test_long_history_summarized() {
        let messages = history(10);
        let processed = processor()
            .process(&FixedSummaryProvider, &messages, "next question")
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(
            processed
                .context
                .contains("Previous Conversation Summary:\nthe user asked about revenue")
        );
        assert!(processed.context.contains("Current Query: next question"));

        // Summary message + at most 3 verbatim turns.
        assert_eq!(processed.display_messages.len(), 1 + 3 * 2);
        assert_eq!(processed.display_messages[0].role, MessageRole::System);
        assert!(
            processed.display_messages[0]
                .content
                .starts_with("[Conversation Summary of First 5 Turns]")
        );
        // The verbatim tail is the most recent turns.
        assert_eq!(
            processed.display_messages.last().map(|m| m.content.as_str()),
            Some("answer 9")
        );
    }

    #[tokio::test]
    async fn test_idempotent_output() {
        let messages = history(10);
        let p = processor();
        let first = p
            .process(&FixedSummaryProvider, &messages, "q")
            .await
            .unwrap_or_else(|_| unreachable!());
        let second = p
            .process(&FixedSummaryProvider, &messages, "q")
            .await
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(first.context, second.context);
        assert_eq!(
            first.display_messages.len(),
            second.display_messages.len()
        );
    }

    #[tokio::test]
    async fn test_summary_failure_is_stage_error() {
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
                    message: "boom".to_string(),
                    status: Some(500),
                })
            }

            async fn process_multimodal_messages(
                &self,
                _messages: &[ChatMessage],
                _max_tokens: u32,
                _temperature: f32,
            ) -> Result<String, AgentError> {
                Ok(String::new())
            }
        }

        let messages = history(10);
        let result = processor()
            .process(&FailingProvider, &messages, "q")
            .await;
        assert!(matches!(
            result,
            Err(AgentError::ContextProcessing { .. })
        ));
    }
}
