use thiserror::Error;

use crate::taxonomy::{ApiFailure, ErrorKind};

/// Failure reported by the byte-stream transport
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Classification of the transport failure
    pub kind: ErrorKind,
    /// Description from the transport
    pub message: String,
}

impl TransportError {
    /// The transport gave up waiting for data
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            message: message.into(),
        }
    }

    /// The connection dropped or failed mid-stream
    pub fn disconnected(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ServerTransient,
            message: message.into(),
        }
    }
}

/// Errors surfaced while decoding an event stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The cancellation token fired
    #[error("stream cancelled")]
    Cancelled,

    /// The underlying transport failed
    #[error("stream transport error: {0}")]
    Transport(#[from] TransportError),
}

impl DecodeError {
    /// Taxonomy kind for this error
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Transport(e) => e.kind,
        }
    }
}

impl From<DecodeError> for ApiFailure {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Cancelled => Self::cancelled(),
            DecodeError::Transport(e) => Self::new(e.kind, e.message),
        }
    }
}
