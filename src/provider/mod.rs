//! Pluggable model provider abstraction.
//!
//! Implementations translate provider-agnostic [`ChatMessage`] lists into
//! vendor SDK calls. All pipeline logic goes through the [`Provider`]
//! trait, so the orchestrator and its components never see transport
//! details. Calls are point-to-point request/response; no streaming.

pub mod message;
pub mod openai;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::AgentConfig;
use crate::error::AgentError;
pub use message::{
    ChatMessage, ContentPart, ImageDetail, MessageContent, multimodal_user_message,
    system_message, user_message,
};
pub use openai::OpenAiProvider;

/// Trait for model provider backends.
///
/// `process_text_messages` handles text-only requests; multimodal requests
/// with page images go through `process_multimodal_messages`, typically
/// against a vision-capable model.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Executes a text-only completion and returns the response text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn process_text_messages(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AgentError>;

    /// Executes a completion whose messages may carry page images.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures or unreadable image paths.
    async fn process_multimodal_messages(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AgentError>;

    /// Cost of the most recent call, if the backend reports one.
    ///
    /// Polled by the orchestrator after call groups to accumulate the
    /// query's total cost. The default implementation reports nothing.
    fn last_cost(&self) -> Option<f64> {
        None
    }
}

/// Creates a [`Provider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default) — OpenAI-compatible APIs, including proxies and
///   routers via the base URL override
///
/// # Errors
///
/// Returns [`AgentError::UnsupportedProvider`] for unknown provider names.
pub fn create_provider(config: &AgentConfig) -> Result<Arc<dyn Provider>, AgentError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(config))),
        other => Err(AgentError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_openai_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("openai")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let provider = create_provider(&config);
        assert!(provider.is_ok());
        assert_eq!(provider.unwrap_or_else(|_| unreachable!()).name(), "openai");
    }

    #[test]
    fn test_create_unknown_provider() {
        let config = AgentConfig::builder()
            .api_key("test")
            .provider("unknown")
            .build()
            .unwrap_or_else(|_| unreachable!());
        let result = create_provider(&config);
        assert!(matches!(
            result,
            Err(AgentError::UnsupportedProvider { .. })
        ));
    }
}
