use serde::{Deserialize, Serialize};

use super::message::{Content, Role, ToolCall};
use super::response::{FinishReason, Usage};

/// Typed event produced by the stream decoder
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental text; may be empty
    ContentDelta(String),
    /// Response metadata, sent once near the start of the stream
    MetadataDelta(StreamMetadata),
    /// Token counts, usually the last event
    Usage(Usage),
    /// Logical completion of the response
    Done {
        /// Why generation stopped, when the vendor reported it
        finish_reason: Option<FinishReason>,
    },
}

/// Metadata carried by the first chunk of a stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamMetadata {
    /// Response identifier
    pub id: Option<String>,
    /// Model serving the request
    pub model: Option<String>,
    /// Author role of the streamed message
    pub role: Option<Role>,
    /// Detected audio language (transcription streams)
    pub language: Option<String>,
}

// -- Chat completion wire chunks --

/// One `data:` payload of a chat completion stream
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletionChunk {
    /// Chunk identifier
    #[serde(default)]
    pub id: Option<String>,
    /// Object type
    #[serde(default)]
    pub object: Option<String>,
    /// Creation timestamp
    #[serde(default)]
    pub created: Option<u64>,
    /// Model used
    #[serde(default)]
    pub model: Option<String>,
    /// Delta choices
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    /// Usage (on the final chunk)
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// Choice within a streaming chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkChoice {
    /// Choice index
    #[serde(default)]
    pub index: u32,
    /// Delta content
    #[serde(default)]
    pub delta: ChunkDelta,
    /// Finish reason (on the final chunk)
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

/// Delta content within a streaming choice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkDelta {
    /// Role (first chunk only)
    #[serde(default)]
    pub role: Option<Role>,
    /// Incremental content
    #[serde(default)]
    pub content: Option<Content>,
    /// Incremental tool calls
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
}

// -- Audio transcription wire events --

/// One `data:` payload of an audio transcription stream
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TranscriptionStreamEvent {
    /// Detected language of the audio
    #[serde(rename = "transcription.language")]
    Language {
        /// ISO language code
        audio_language: String,
    },
    /// Timestamped segment
    #[serde(rename = "transcription.segment")]
    Segment {
        /// Segment text
        text: String,
        /// Start offset in seconds
        start: f64,
        /// End offset in seconds
        end: f64,
    },
    /// Incremental transcript text
    #[serde(rename = "transcription.text.delta")]
    TextDelta {
        /// Text fragment
        text: String,
    },
    /// Final transcript summary
    #[serde(rename = "transcription.done")]
    Done {
        /// Model used
        #[serde(default)]
        model: Option<String>,
        /// Full transcript
        #[serde(default)]
        text: String,
        /// Detected language
        #[serde(default)]
        language: Option<String>,
        /// Usage statistics
        #[serde(default)]
        usage: Option<Usage>,
    },
}
