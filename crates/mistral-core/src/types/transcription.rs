use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::response::Usage;

/// Audio transcription request
///
/// Sent as `multipart/form-data`, so it is not serialized with serde.
/// Exactly one audio source must be set.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionRequest {
    /// Model identifier
    pub model: String,
    /// Uploaded audio
    pub file: Option<AudioFile>,
    /// Publicly reachable audio URL
    pub file_url: Option<String>,
    /// ID of a previously uploaded file
    pub file_id: Option<String>,
    /// Language hint (ISO code)
    pub language: Option<String>,
    /// Sampling temperature
    pub temperature: Option<f64>,
    /// Timestamp granularities to return (e.g. "segment")
    pub timestamp_granularities: Vec<String>,
}

impl TranscriptionRequest {
    /// Transcribe uploaded audio bytes
    pub fn from_file(model: impl Into<String>, file_name: impl Into<String>, data: Bytes) -> Self {
        Self {
            model: model.into(),
            file: Some(AudioFile {
                file_name: file_name.into(),
                data,
            }),
            ..Self::default()
        }
    }

    /// Transcribe audio fetched by the vendor from `url`
    pub fn from_url(model: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            file_url: Some(url.into()),
            ..Self::default()
        }
    }
}

/// Audio payload uploaded with a transcription request
#[derive(Debug, Clone)]
pub struct AudioFile {
    /// File name reported to the vendor
    pub file_name: String,
    /// Raw audio bytes
    pub data: Bytes,
}

/// Transcription response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Model used
    pub model: String,
    /// Full transcript
    pub text: String,
    /// Detected language
    #[serde(default)]
    pub language: Option<String>,
    /// Timestamped segments, when requested
    #[serde(default)]
    pub segments: Vec<TranscriptionSegment>,
    /// Usage statistics
    pub usage: Usage,
}

/// Timestamped transcript segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionSegment {
    /// Segment text
    pub text: String,
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
}
