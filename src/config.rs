//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment
//! variables → defaults. One `AgentConfig` is constructed up front and
//! passed by reference into the orchestrator and collaborators; there is
//! no process-wide singleton.

use std::path::PathBuf;

use crate::error::AgentError;

/// Default maximum task-execution/replanning iterations per query.
const DEFAULT_MAX_ITERATIONS: u32 = 5;
/// Default maximum tasks in an initial plan.
const DEFAULT_MAX_TASKS_PER_PLAN: usize = 4;
/// Default page count recommended to the selector per task.
const DEFAULT_MAX_PAGES_PER_TASK: usize = 6;
/// Default conversation turn count that triggers summarization.
const DEFAULT_MAX_CONVERSATION_TURNS: usize = 8;
/// Default number of leading turns folded into the summary.
const DEFAULT_TURNS_TO_SUMMARIZE: usize = 5;
/// Default number of trailing turns kept verbatim.
const DEFAULT_TURNS_TO_KEEP_FULL: usize = 3;
/// Default byte budget for task findings quoted in plan-update prompts.
const DEFAULT_FINDINGS_TRUNCATE_LEN: usize = 500;

/// Configuration for the agent pipeline.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: String,
    /// Optional base URL override (for routers or compatible APIs).
    pub base_url: Option<String>,
    /// Model for text-only calls (planning, classification, synthesis).
    pub text_model: String,
    /// Vision-capable model for multimodal calls (selection, analysis).
    pub vision_model: String,
    /// Maximum task-execution/replanning iterations per query. The only
    /// circuit breaker in the pipeline.
    pub max_iterations: u32,
    /// Hard cap on tasks in an initial plan.
    pub max_tasks_per_plan: usize,
    /// Page count the selection prompt recommends per task (not enforced
    /// on the response).
    pub max_pages_per_task: usize,
    /// Conversation turn count at which summarization kicks in.
    pub max_conversation_turns: usize,
    /// Leading turns folded into the summary when summarizing.
    pub turns_to_summarize: usize,
    /// Trailing turns kept verbatim when summarizing.
    pub turns_to_keep_full: usize,
    /// Byte budget for the latest task's findings in plan-update prompts.
    pub findings_truncate_len: usize,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key is found.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    text_model: Option<String>,
    vision_model: Option<String>,
    max_iterations: Option<u32>,
    max_tasks_per_plan: Option<usize>,
    max_pages_per_task: Option<usize>,
    max_conversation_turns: Option<usize>,
    turns_to_summarize: Option<usize>,
    turns_to_keep_full: Option<usize>,
    findings_truncate_len: Option<usize>,
    prompt_dir: Option<PathBuf>,
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = std::env::var("VISRAG_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("VISRAG_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("VISRAG_BASE_URL"))
                .ok();
        }
        if self.text_model.is_none() {
            self.text_model = std::env::var("VISRAG_TEXT_MODEL").ok();
        }
        if self.vision_model.is_none() {
            self.vision_model = std::env::var("VISRAG_VISION_MODEL").ok();
        }
        if self.max_iterations.is_none() {
            self.max_iterations = std::env::var("VISRAG_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_tasks_per_plan.is_none() {
            self.max_tasks_per_plan = std::env::var("VISRAG_MAX_TASKS_PER_PLAN")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_pages_per_task.is_none() {
            self.max_pages_per_task = std::env::var("VISRAG_MAX_PAGES_PER_TASK")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("VISRAG_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the model provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the text model.
    #[must_use]
    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = Some(model.into());
        self
    }

    /// Sets the vision model.
    #[must_use]
    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = Some(model.into());
        self
    }

    /// Sets the maximum pipeline iterations.
    #[must_use]
    pub const fn max_iterations(mut self, n: u32) -> Self {
        self.max_iterations = Some(n);
        self
    }

    /// Sets the maximum tasks per initial plan.
    #[must_use]
    pub const fn max_tasks_per_plan(mut self, n: usize) -> Self {
        self.max_tasks_per_plan = Some(n);
        self
    }

    /// Sets the recommended pages per task.
    #[must_use]
    pub const fn max_pages_per_task(mut self, n: usize) -> Self {
        self.max_pages_per_task = Some(n);
        self
    }

    /// Sets the turn count that triggers conversation summarization.
    #[must_use]
    pub const fn max_conversation_turns(mut self, n: usize) -> Self {
        self.max_conversation_turns = Some(n);
        self
    }

    /// Sets how many leading turns get summarized.
    #[must_use]
    pub const fn turns_to_summarize(mut self, n: usize) -> Self {
        self.turns_to_summarize = Some(n);
        self
    }

    /// Sets how many trailing turns stay verbatim.
    #[must_use]
    pub const fn turns_to_keep_full(mut self, n: usize) -> Self {
        self.turns_to_keep_full = Some(n);
        self
    }

    /// Sets the findings byte budget for plan-update prompts.
    #[must_use]
    pub const fn findings_truncate_len(mut self, n: usize) -> Self {
        self.findings_truncate_len = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ApiKeyMissing`] if no API key was set.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let api_key = self.api_key.ok_or(AgentError::ApiKeyMissing)?;

        Ok(AgentConfig {
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            text_model: self.text_model.unwrap_or_else(|| "gpt-4o".to_string()),
            vision_model: self.vision_model.unwrap_or_else(|| "gpt-4o".to_string()),
            max_iterations: self.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            max_tasks_per_plan: self.max_tasks_per_plan.unwrap_or(DEFAULT_MAX_TASKS_PER_PLAN),
            max_pages_per_task: self.max_pages_per_task.unwrap_or(DEFAULT_MAX_PAGES_PER_TASK),
            max_conversation_turns: self
                .max_conversation_turns
                .unwrap_or(DEFAULT_MAX_CONVERSATION_TURNS),
            turns_to_summarize: self.turns_to_summarize.unwrap_or(DEFAULT_TURNS_TO_SUMMARIZE),
            turns_to_keep_full: self.turns_to_keep_full.unwrap_or(DEFAULT_TURNS_TO_KEEP_FULL),
            findings_truncate_len: self
                .findings_truncate_len
                .unwrap_or(DEFAULT_FINDINGS_TRUNCATE_LEN),
            prompt_dir: self.prompt_dir,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .api_key("test-key")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "openai");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.max_iterations, DEFAULT_MAX_ITERATIONS);
        assert_eq!(config.max_tasks_per_plan, DEFAULT_MAX_TASKS_PER_PLAN);
        assert_eq!(config.text_model, "gpt-4o");
        assert_eq!(config.vision_model, "gpt-4o");
    }

    #[test]
    fn test_builder_missing_api_key() {
        let result = AgentConfig::builder().build();
        assert!(matches!(result, Err(AgentError::ApiKeyMissing)));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .api_key("key")
            .provider("custom")
            .vision_model("gpt-4o-mini")
            .max_iterations(3)
            .max_tasks_per_plan(2)
            .turns_to_keep_full(1)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, "custom");
        assert_eq!(config.vision_model, "gpt-4o-mini");
        assert_eq!(config.max_iterations, 3);
        assert_eq!(config.max_tasks_per_plan, 2);
        assert_eq!(config.turns_to_keep_full, 1);
    }
}
