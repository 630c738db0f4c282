#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Core of the Mistral REST client
//!
//! Request validation, the error taxonomy, response interpretation and the
//! incremental stream decoder. Nothing here performs I/O of its own: bytes
//! come in, typed values go out.

pub mod accumulator;
pub mod decode;
pub mod error;
pub mod interpret;
pub mod taxonomy;
pub mod types;
pub mod validate;

pub use accumulator::StreamAccumulator;
pub use decode::{EventStream, decode, decode_chat, decode_transcription};
pub use error::{DecodeError, TransportError};
pub use interpret::{InterpretedResponse, interpret, interpret_with_retry_after};
pub use taxonomy::{ApiFailure, ErrorKind};
pub use types::*;
pub use validate::{Validate, ValidationResult, validate};
