use serde::{Deserialize, Serialize};

/// Role of a message participant
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    /// System instruction
    System,
    /// User message
    User,
    /// Assistant response
    Assistant,
    /// Tool/function result
    Tool,
    /// Role string this client does not recognize
    #[serde(other)]
    Unknown,
}

/// Message in a conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message author
    pub role: Role,
    /// Message content
    pub content: Content,
    /// Optional participant name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Tool calls made by the assistant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// ID of the tool call this message is a response to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn with_role(role: Role, content: impl Into<Content>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<Content>) -> Self {
        Self::with_role(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<Content>) -> Self {
        Self::with_role(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<Content>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// Create a tool result message answering `tool_call_id`
    pub fn tool(tool_call_id: &str, content: impl Into<Content>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.to_owned()),
            ..Self::with_role(Role::Tool, content)
        }
    }
}

/// Message content, either plain text or typed chunks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Content {
    /// Plain text content
    Text(String),
    /// Ordered content chunks (text, thinking, images)
    Chunks(Vec<ContentChunk>),
}

impl Content {
    /// Visible text, joining text chunks and skipping thinking and images
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Chunks(chunks) => chunks
                .iter()
                .filter_map(|chunk| match chunk {
                    ContentChunk::Text { text } => Some(text.as_str()),
                    ContentChunk::Thinking { .. } | ContentChunk::ImageUrl { .. } => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// Reasoning text from thinking chunks, if any
    pub fn thinking(&self) -> Option<String> {
        let Self::Chunks(chunks) = self else {
            return None;
        };

        let parts: Vec<&str> = chunks
            .iter()
            .filter_map(|chunk| match chunk {
                ContentChunk::Thinking { thinking, .. } => Some(thinking),
                ContentChunk::Text { .. } | ContentChunk::ImageUrl { .. } => None,
            })
            .flatten()
            .map(|part| match part {
                ThinkingPart::Text { text } => text.as_str(),
            })
            .collect();

        if parts.is_empty() { None } else { Some(parts.join("")) }
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<ContentChunk>> for Content {
    fn from(chunks: Vec<ContentChunk>) -> Self {
        Self::Chunks(chunks)
    }
}

/// Individual chunk within a chunked message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentChunk {
    /// Text block
    Text {
        /// The text string
        text: String,
    },
    /// Reasoning trace emitted by thinking-capable models
    Thinking {
        /// Nested reasoning parts
        thinking: Vec<ThinkingPart>,
        /// Whether the reasoning block was closed by the model
        #[serde(default, skip_serializing_if = "Option::is_none")]
        closed: Option<bool>,
    },
    /// Image reference
    ImageUrl {
        /// URL or base64 data URI
        image_url: ImageUrl,
    },
}

/// Part of a thinking chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ThinkingPart {
    /// Reasoning text
    Text {
        /// The text string
        text: String,
    },
}

/// Image location with optional detail hint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageUrl {
    /// URL or base64 data URI for the image
    pub url: String,
    /// Detail level hint (e.g. "auto", "low", "high")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// A tool/function call requested by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this tool call
    #[serde(default)]
    pub id: String,
    /// Function name and arguments
    pub function: FunctionCall,
}

/// Function name and arguments within a tool call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Function name
    pub name: String,
    /// JSON-encoded arguments
    pub arguments: String,
}
