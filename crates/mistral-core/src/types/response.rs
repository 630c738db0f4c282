use serde::{Deserialize, Serialize};

use super::message::{Content, Role, ToolCall};

/// Reason the model stopped generating
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural end of generation
    Stop,
    /// Hit the `max_tokens` limit
    Length,
    /// Hit the model's context length
    ModelLength,
    /// Generation failed upstream
    Error,
    /// Model decided to call a tool
    ToolCalls,
    /// Reason not recognized by this client
    #[serde(other)]
    Other,
}

/// Token usage statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens consumed by the prompt
    #[serde(default)]
    pub prompt_tokens: u32,
    /// Tokens generated in the completion
    #[serde(default)]
    pub completion_tokens: u32,
    /// Total tokens (prompt + completion)
    #[serde(default)]
    pub total_tokens: u32,
    /// Seconds of audio in the prompt (transcription only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt_audio_seconds: Option<u32>,
}

/// Chat completion response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatCompletionResponse {
    /// Unique response identifier
    pub id: String,
    /// Object type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    /// Unix timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<u64>,
    /// Model used
    pub model: String,
    /// Generated choices
    pub choices: Vec<Choice>,
    /// Token usage statistics
    pub usage: Usage,
}

impl ChatCompletionResponse {
    /// Visible text of the first choice
    pub fn text(&self) -> Option<String> {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_ref())
            .map(Content::text)
    }
}

/// A single completion choice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Choice {
    /// Index of this choice
    pub index: u32,
    /// Generated message
    pub message: AssistantMessage,
    /// Why generation stopped
    pub finish_reason: Option<FinishReason>,
}

/// Message produced by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    /// Role (always assistant)
    pub role: Role,
    /// Text or chunked content; absent when only tool calls are returned
    #[serde(default)]
    pub content: Option<Content>,
    /// Tool calls requested by the model
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_finish_reason_maps_to_other() {
        let reason: FinishReason = serde_json::from_str(r#""content_filter""#).unwrap();
        assert_eq!(reason, FinishReason::Other);
    }

    #[test]
    fn text_reads_first_choice() {
        let json = r#"{
            "id": "cmpl-1",
            "model": "mistral-small-latest",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "hello"}, "finish_reason": "stop"}
            ],
            "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
        }"#;

        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.text().as_deref(), Some("hello"));
        assert_eq!(resp.usage.total_tokens, 4);
    }

    #[test]
    fn tool_only_message_has_no_text() {
        let json = r#"{
            "id": "cmpl-2",
            "model": "m",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{"id": "c1", "function": {"name": "f", "arguments": "{}"}}]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        }"#;

        let resp: ChatCompletionResponse = serde_json::from_str(json).unwrap();
        assert!(resp.text().is_none());
        assert_eq!(resp.choices[0].finish_reason, Some(FinishReason::ToolCalls));
    }
}
