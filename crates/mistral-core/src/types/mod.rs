//! Request, response, and stream types for the Mistral REST API

pub mod embedding;
pub mod message;
pub mod model;
pub mod request;
pub mod response;
pub mod stream;
pub mod transcription;

pub use embedding::{EmbeddingData, EmbeddingInput, EmbeddingRequest, EmbeddingResponse};
pub use message::{Content, ContentChunk, FunctionCall, ImageUrl, Message, Role, ThinkingPart, ToolCall};
pub use model::{DeletedModel, ModelCard, ModelList};
pub use request::{
    ChatCompletionRequest, FunctionDefinition, JsonSchema, ResponseFormat, Stop, ToolChoice, ToolChoiceFunction,
    ToolChoiceFunctionName, ToolChoiceMode, ToolDefinition,
};
pub use response::{AssistantMessage, ChatCompletionResponse, Choice, FinishReason, Usage};
pub use stream::{
    ChatCompletionChunk, ChunkChoice, ChunkDelta, StreamEvent, StreamMetadata, TranscriptionStreamEvent,
};
pub use transcription::{AudioFile, TranscriptionRequest, TranscriptionResponse, TranscriptionSegment};
