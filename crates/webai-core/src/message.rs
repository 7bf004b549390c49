use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message in the agent's conversation with the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: Vec<MessageContent>,
    pub timestamp: DateTime<Utc>,
}

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single content block within a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        text: String,
    },
    Image {
        /// Base64-encoded image bytes (no `data:` prefix).
        data: String,
        media_type: String,
    },
}

impl MessageContent {
    /// Render an image block as a `data:` URL.
    pub fn data_url(&self) -> Option<String> {
        match self {
            MessageContent::Image { data, media_type } => {
                Some(format!("data:{media_type};base64,{data}"))
            }
            MessageContent::Text { .. } => None,
        }
    }
}

impl Message {
    /// Create a simple text message.
    pub fn text(role: Role, text: impl Into<String>) -> Self {
        Self::with_content(role, vec![MessageContent::Text { text: text.into() }])
    }

    /// Create a message from arbitrary content blocks.
    pub fn with_content(role: Role, content: Vec<MessageContent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content,
            timestamp: Utc::now(),
        }
    }

    /// A user message carrying an image followed by an instruction.
    pub fn image(
        role: Role,
        data: impl Into<String>,
        media_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self::with_content(
            role,
            vec![
                MessageContent::Image {
                    data: data.into(),
                    media_type: media_type.into(),
                },
                MessageContent::Text { text: text.into() },
            ],
        )
    }

    /// Extract all text content joined together.
    pub fn text_content(&self) -> String {
        self.content
            .iter()
            .filter_map(|c| match c {
                MessageContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_image(&self) -> bool {
        self.content
            .iter()
            .any(|c| matches!(c, MessageContent::Image { .. }))
    }
}
