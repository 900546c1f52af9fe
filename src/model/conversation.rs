//! Conversation history types.
//!
//! The caller owns the ordered message log; the pipeline only reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a conversation participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// System instructions or synthetic summary messages.
    System,
    /// End-user input.
    User,
    /// Model response.
    Assistant,
}

impl MessageRole {
    /// Returns the wire string for this role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single immutable conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationMessage {
    /// Who authored the message.
    pub role: MessageRole,
    /// Message text.
    pub content: String,
    /// When the message was created.
    pub timestamp: DateTime<Utc>,
    /// Pipeline cost attributed to this message (assistant messages carry
    /// the query's accumulated total).
    #[serde(default)]
    pub cost: f64,
}

impl ConversationMessage {
    /// Creates a message with the given role, stamped now.
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            cost: 0.0,
        }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    /// Attaches a cost to the message.
    #[must_use]
    pub const fn with_cost(mut self, cost: f64) -> Self {
        self.cost = cost;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(ConversationMessage::user("hi").role, MessageRole::User);
        assert_eq!(
            ConversationMessage::assistant("hello").role,
            MessageRole::Assistant
        );
        assert_eq!(ConversationMessage::system("note").role, MessageRole::System);
    }

    #[test]
    fn test_with_cost() {
        let msg = ConversationMessage::assistant("answer").with_cost(0.02);
        assert!((msg.cost - 0.02).abs() < f64::EPSILON);
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&MessageRole::Assistant).unwrap_or_default();
        assert_eq!(json, "\"assistant\"");
    }
}
