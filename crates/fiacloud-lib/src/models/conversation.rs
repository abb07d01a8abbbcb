// Conversation data models
// Chat history persisted as a whole collection

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Title given to conversations before the first message arrives
pub const DEFAULT_CONVERSATION_TITLE: &str = "新对话";

/// Message author role
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
    System,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
            MessageRole::System => "system",
        }
    }
}

/// How a message should be presented
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum MessageType {
    #[default]
    Text,
    /// Placeholder card standing for an AI file edit under review
    EditCard,
}

/// Single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub message_type: Option<MessageType>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
            message_type: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            message_type: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
            message_type: None,
        }
    }

    pub fn edit_card(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
            message_type: Some(MessageType::EditCard),
        }
    }

    pub fn is_edit_card(&self) -> bool {
        self.message_type == Some(MessageType::EditCard)
    }
}

/// Chat session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub messages: Vec<Message>,
    /// Milliseconds since the Unix epoch
    pub created_at: i64,
}

impl Conversation {
    /// Create an empty conversation with the default title
    pub fn new() -> Self {
        Self::with_title(DEFAULT_CONVERSATION_TITLE)
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            messages: Vec::new(),
            created_at: Utc::now().timestamp_millis(),
        }
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// First `max_chars` characters of `text`
pub fn title_from(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
