//! Provider-agnostic message types for model communication.
//!
//! These types decouple pipeline logic from any specific model SDK.
//! Multimodal content is an ordered list of tagged items; image items
//! carry a filesystem path and a detail level, and the provider
//! implementation is responsible for encoding the image bytes.

use serde::{Deserialize, Serialize};

use crate::model::MessageRole;

/// Fidelity level requested for an image in a vision call.
///
/// Page selection scans many candidate images at [`Low`](Self::Low) detail;
/// per-task analysis reads the few selected pages at [`High`](Self::High).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageDetail {
    /// Downscaled, cheap to process.
    Low,
    /// Full resolution.
    High,
}

impl ImageDetail {
    /// Returns the wire string for this detail level.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::High => "high",
        }
    }
}

/// One item of multimodal message content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text.
    Text {
        /// The text content.
        text: String,
    },
    /// A page image referenced by path.
    ImagePath {
        /// Path to the image file.
        image_path: String,
        /// Requested fidelity.
        detail: ImageDetail,
    },
}

impl ContentPart {
    /// Creates a text part.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Creates an image part.
    #[must_use]
    pub fn image(image_path: impl Into<String>, detail: ImageDetail) -> Self {
        Self::ImagePath {
            image_path: image_path.into(),
            detail,
        }
    }
}

/// Message content: either plain text or an ordered list of parts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Text-only content.
    Text(String),
    /// Mixed text and image content.
    Parts(Vec<ContentPart>),
}

/// A single chat message sent to a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: MessageRole,
    /// Message content.
    pub content: MessageContent,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: MessageRole::System,
        content: MessageContent::Text(content.to_string()),
    }
}

/// Creates a text-only user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: MessageRole::User,
        content: MessageContent::Text(content.to_string()),
    }
}

/// Creates a user message with mixed text and image content.
#[must_use]
pub const fn multimodal_user_message(parts: Vec<ContentPart>) -> ChatMessage {
    ChatMessage {
        role: MessageRole::User,
        content: MessageContent::Parts(parts),
    }
}
