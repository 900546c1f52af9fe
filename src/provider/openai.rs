//! OpenAI-compatible provider implementation using the `async-openai` crate.
//!
//! Supports any OpenAI-compatible API (OpenAI, Azure, routers and local
//! proxies) via the base URL override in [`AgentConfig`]. Page images are
//! shipped inline as base64 data URLs with the per-image detail level
//! requested by the caller.

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImage, ChatCompletionRequestMessageContentPartText,
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequest, ImageDetail as OpenAiImageDetail, ImageUrl,
};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::debug;

use super::Provider;
use super::message::{ChatMessage, ContentPart, ImageDetail, MessageContent};
use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::model::MessageRole;

/// OpenAI-compatible model provider.
///
/// Uses the configured text model for text-only requests and the vision
/// model for multimodal requests.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    text_model: String,
    vision_model: String,
}

impl OpenAiProvider {
    /// Creates a new provider from agent configuration.
    #[must_use]
    pub fn new(config: &AgentConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            text_model: config.text_model.clone(),
            vision_model: config.vision_model.clone(),
        }
    }

    /// Guesses the image MIME type from the file extension.
    fn mime_type(path: &str) -> &'static str {
        match std::path::Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("png") => "image/png",
            Some("webp") => "image/webp",
            _ => "image/jpeg",
        }
    }

    /// Reads an image file and encodes it as a base64 data URL.
    async fn image_data_url(path: &str) -> Result<String, AgentError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AgentError::ImageEncoding {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        Ok(format!(
            "data:{};base64,{}",
            Self::mime_type(path),
            BASE64.encode(bytes)
        ))
    }

    const fn convert_detail(detail: ImageDetail) -> OpenAiImageDetail {
        match detail {
            ImageDetail::Low => OpenAiImageDetail::Low,
            ImageDetail::High => OpenAiImageDetail::High,
        }
    }

    /// Flattens message content to plain text, ignoring image parts.
    fn content_as_text(content: &MessageContent) -> String {
        match content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text } => Some(text.as_str()),
                    ContentPart::ImagePath { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Converts one message, encoding any image parts into data URLs.
    async fn convert_message(msg: &ChatMessage) -> Result<ChatCompletionRequestMessage, AgentError> {
        match msg.role {
            MessageRole::System => Ok(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: async_openai::types::ChatCompletionRequestSystemMessageContent::Text(
                        Self::content_as_text(&msg.content),
                    ),
                    name: None,
                },
            )),
            MessageRole::Assistant => {
                #[allow(deprecated)]
                Ok(ChatCompletionRequestMessage::Assistant(
                    ChatCompletionRequestAssistantMessage {
                        content: Some(
                            async_openai::types::ChatCompletionRequestAssistantMessageContent::Text(
                                Self::content_as_text(&msg.content),
                            ),
                        ),
                        name: None,
                        tool_calls: None,
                        refusal: None,
                        audio: None,
                        function_call: None,
                    },
                ))
            }
            MessageRole::User => {
                let content = match &msg.content {
                    MessageContent::Text(text) => {
                        ChatCompletionRequestUserMessageContent::Text(text.clone())
                    }
                    MessageContent::Parts(parts) => {
                        let mut converted = Vec::with_capacity(parts.len());
                        for part in parts {
                            converted.push(Self::convert_part(part).await?);
                        }
                        ChatCompletionRequestUserMessageContent::Array(converted)
                    }
                };
                Ok(ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content,
                        name: None,
                    },
                ))
            }
        }
    }

    async fn convert_part(
        part: &ContentPart,
    ) -> Result<ChatCompletionRequestUserMessageContentPart, AgentError> {
        match part {
            ContentPart::Text { text } => Ok(ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText { text: text.clone() },
            )),
            ContentPart::ImagePath { image_path, detail } => {
                let url = Self::image_data_url(image_path).await?;
                Ok(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                    ChatCompletionRequestMessageContentPartImage {
                        image_url: ImageUrl {
                            url,
                            detail: Some(Self::convert_detail(*detail)),
                        },
                    },
                ))
            }
        }
    }

    async fn complete(
        &self,
        model: &str,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AgentError> {
        let mut converted = Vec::with_capacity(messages.len());
        for msg in messages {
            converted.push(Self::convert_message(msg).await?);
        }

        let request = CreateChatCompletionRequest {
            model: model.to_string(),
            messages: converted,
            temperature: Some(temperature),
            max_completion_tokens: Some(max_tokens),
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AgentError::ApiRequest {
                message: e.to_string(),
                status: None,
            })?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_ref())
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        debug!(model, response_len = content.len(), "completion received");
        Ok(content)
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn process_text_messages(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AgentError> {
        self.complete(&self.text_model, messages, max_tokens, temperature)
            .await
    }

    async fn process_multimodal_messages(
        &self,
        messages: &[ChatMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, AgentError> {
        self.complete(&self.vision_model, messages, max_tokens, temperature)
            .await
    }
}
