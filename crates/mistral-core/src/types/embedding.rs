use serde::{Deserialize, Serialize};

use super::response::Usage;

/// Embedding request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    /// Model identifier
    pub model: String,
    /// Input text(s) to embed
    pub input: EmbeddingInput,
    /// Requested vector size (model-dependent)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dimension: Option<u32>,
    /// Encoding of the returned vectors ("float" or "base64")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_format: Option<String>,
}

impl EmbeddingRequest {
    /// Embed a batch of texts with `model`
    pub fn new(model: impl Into<String>, inputs: Vec<String>) -> Self {
        Self {
            model: model.into(),
            input: EmbeddingInput::Multiple(inputs),
            output_dimension: None,
            encoding_format: None,
        }
    }
}

/// Embedding input: single string or array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    /// Single text input
    Single(String),
    /// Multiple text inputs
    Multiple(Vec<String>),
}

impl EmbeddingInput {
    /// Iterate over the input texts
    pub fn texts(&self) -> Vec<&str> {
        match self {
            Self::Single(text) => vec![text.as_str()],
            Self::Multiple(texts) => texts.iter().map(String::as_str).collect(),
        }
    }
}

/// Embedding response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    /// Response identifier
    pub id: String,
    /// Object type (always "list")
    #[serde(default)]
    pub object: String,
    /// Model used
    pub model: String,
    /// Embedding results
    pub data: Vec<EmbeddingData>,
    /// Token usage
    pub usage: Usage,
}

/// Single embedding entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingData {
    /// Object type (always "embedding")
    #[serde(default)]
    pub object: String,
    /// The embedding vector
    pub embedding: Vec<f32>,
    /// Index in the input array
    pub index: usize,
}
