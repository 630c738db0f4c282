use mistral_core::ApiFailure;

/// Client-specific result type
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors from the Mistral client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The vendor, or the transport on the way to it, reported a failure
    #[error(transparent)]
    Api(#[from] ApiFailure),

    /// Client-side validation rejected the request
    #[error("invalid request: {}", .0.join("; "))]
    InvalidRequest(Vec<String>),

    /// The request could not be built
    #[error("failed to build request: {0}")]
    Request(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Underlying API failure, if this is one
    pub const fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Api(failure) => Some(failure),
            _ => None,
        }
    }
}
