//! Closed classification of failed calls with retry policy
//!
//! Every failure the client surfaces carries an [`ErrorKind`]. The kind
//! decides whether re-issuing the request is expected to succeed and how
//! long to wait first, so callers can retry without re-deriving policy.

use std::time::Duration;

/// Suggested wait after a rate limit response
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// Suggested wait after a client-side timeout
const TIMEOUT_BACKOFF: Duration = Duration::from_secs(5);

/// Classification of a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::AsRefStr, strum::EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Input rejected by the client or the vendor
    Validation,
    /// Missing or invalid credentials
    Authentication,
    /// Too many requests
    RateLimited,
    /// Model or resource does not exist
    NotFound,
    /// Temporary server-side failure
    ServerTransient,
    /// Permanent server-side failure
    ServerFatal,
    /// Transport gave up waiting
    Timeout,
    /// Caller cancelled the operation
    Cancelled,
    /// Anything that could not be classified
    Unknown,
}

impl ErrorKind {
    /// Whether re-issuing the same request is expected to eventually succeed
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimited | Self::ServerTransient | Self::Timeout)
    }

    /// Default wait before retrying, for retryable kinds
    pub const fn default_backoff(self) -> Option<Duration> {
        match self {
            Self::RateLimited => Some(RATE_LIMIT_BACKOFF),
            Self::ServerTransient => Some(Duration::from_secs(5)),
            Self::Timeout => Some(TIMEOUT_BACKOFF),
            Self::Validation
            | Self::Authentication
            | Self::NotFound
            | Self::ServerFatal
            | Self::Cancelled
            | Self::Unknown => None,
        }
    }

    /// Classify an HTTP status code
    pub const fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Authentication,
            404 => Self::NotFound,
            408 => Self::Timeout,
            429 => Self::RateLimited,
            400..=499 => Self::Validation,
            500 | 502 | 503 | 504 => Self::ServerTransient,
            505..=599 | 501 => Self::ServerFatal,
            _ => Self::Unknown,
        }
    }
}

/// Backoff hint for a kind, refined by the exact status when known
pub const fn backoff_for(kind: ErrorKind, status: Option<u16>) -> Option<Duration> {
    match (kind, status) {
        (ErrorKind::ServerTransient, Some(502)) => Some(Duration::from_secs(10)),
        (ErrorKind::ServerTransient, Some(504)) => Some(Duration::from_secs(15)),
        (ErrorKind::ServerTransient, Some(503)) => Some(Duration::from_secs(30)),
        _ => kind.default_backoff(),
    }
}

/// A classified failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ApiFailure {
    /// Stable classification
    pub kind: ErrorKind,
    /// Human-readable description
    pub message: String,
    /// HTTP status, when the failure came from a response
    pub status: Option<u16>,
    /// Suggested wait before retrying
    pub retry_after: Option<Duration>,
    /// Vendor error code
    pub code: Option<String>,
    /// Vendor error type (e.g. `invalid_request_error`)
    pub error_type: Option<String>,
}

impl ApiFailure {
    /// Failure of `kind` with the kind's default backoff
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            retry_after: kind.default_backoff(),
            code: None,
            error_type: None,
        }
    }

    /// Failure classified from an HTTP status
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self::with_kind_and_status(ErrorKind::from_status(status), status, message)
    }

    /// Failure of an explicit kind observed on an HTTP status
    pub fn with_kind_and_status(kind: ErrorKind, status: u16, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: Some(status),
            retry_after: backoff_for(kind, Some(status)),
            code: None,
            error_type: None,
        }
    }

    /// The caller cancelled the operation
    pub fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "operation cancelled")
    }

    #[must_use]
    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    #[must_use]
    pub fn with_error_type(mut self, error_type: Option<String>) -> Self {
        self.error_type = error_type;
        self
    }

    /// Whether retrying the request is expected to succeed
    pub const fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}
