//! Multi-schema response interpretation
//!
//! The vendor's error payloads are not uniform, so a response body is run
//! through an ordered chain of parse attempts. Each step either recognizes
//! its shape or falls through to the next one; the last step always
//! produces a failure, so interpretation never errors.

use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::taxonomy::{ApiFailure, ErrorKind};

/// Outcome of interpreting one HTTP response
#[derive(Debug, Clone, PartialEq)]
pub enum InterpretedResponse<T> {
    /// Body matched the endpoint's success schema
    Success {
        /// Parsed payload
        payload: T,
        /// HTTP status code
        status: u16,
    },
    /// Anything else, classified
    Failure(ApiFailure),
}

impl<T> InterpretedResponse<T> {
    /// Whether this is a success
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Convert into a `Result`, dropping the status code
    pub fn into_result(self) -> Result<T, ApiFailure> {
        match self {
            Self::Success { payload, .. } => Ok(payload),
            Self::Failure(failure) => Err(failure),
        }
    }

    /// Borrow the failure, if any
    pub const fn failure(&self) -> Option<&ApiFailure> {
        match self {
            Self::Success { .. } => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    /// Map the success payload
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> InterpretedResponse<U> {
        match self {
            Self::Success { payload, status } => InterpretedResponse::Success {
                payload: f(payload),
                status,
            },
            Self::Failure(failure) => InterpretedResponse::Failure(failure),
        }
    }
}

/// Interpret a response body against success schema `T`
pub fn interpret<T: DeserializeOwned>(status: u16, body: &[u8]) -> InterpretedResponse<T> {
    interpret_with_retry_after(status, body, None)
}

/// Interpret a response, preferring a server-supplied retry delay
///
/// `retry_after` comes from the `Retry-After` header and replaces the
/// table default for retryable kinds.
pub fn interpret_with_retry_after<T: DeserializeOwned>(
    status: u16,
    body: &[u8],
    retry_after: Option<Duration>,
) -> InterpretedResponse<T> {
    if (200..300).contains(&status) {
        match serde_json::from_slice::<T>(body) {
            Ok(payload) => return InterpretedResponse::Success { payload, status },
            Err(e) => tracing::debug!(status, error = %e, "success body did not match expected schema"),
        }
    }

    let failure = parse_validation_error(status, body)
        .or_else(|| parse_api_error(status, body))
        .or_else(|| parse_error_envelope(status, body))
        .unwrap_or_else(|| unparseable(status, body));

    InterpretedResponse::Failure(finalize(failure, status, retry_after))
}

// -- Schema A: validation errors --

#[derive(Deserialize)]
struct ValidationErrorBody {
    message: ValidationMessage,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ValidationMessage {
    detail: Vec<ValidationDetail>,
}

#[derive(Deserialize)]
struct ValidationDetail {
    msg: String,
}

/// `{"object": "error", "message": {"detail": [{"msg": ...}]}, "type": ...}`
///
/// Also accepts `detail` at the top level.
fn parse_validation_error(status: u16, body: &[u8]) -> Option<ApiFailure> {
    let (detail, error_type, code) = match serde_json::from_slice::<ValidationErrorBody>(body) {
        Ok(parsed) => (parsed.message.detail, parsed.error_type, parsed.code),
        Err(_) => (serde_json::from_slice::<ValidationMessage>(body).ok()?.detail, None, None),
    };

    let first = detail.into_iter().next()?;

    Some(
        ApiFailure::with_kind_and_status(ErrorKind::Validation, status, first.msg)
            .with_error_type(error_type)
            .with_code(code.and_then(code_to_string)),
    )
}

// -- Schema B: flat model/API errors --

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
    #[serde(default, rename = "type")]
    error_type: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

/// `{"object": "error", "message": "...", "type": ..., "code": ...}`
fn parse_api_error(status: u16, body: &[u8]) -> Option<ApiFailure> {
    let parsed: ApiErrorBody = serde_json::from_slice(body).ok()?;

    Some(
        ApiFailure::from_status(status, parsed.message)
            .with_error_type(parsed.error_type)
            .with_code(parsed.code.and_then(code_to_string)),
    )
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

/// `{"error": {"message": ..., "type": ..., "code": ...}}` from compatible gateways
fn parse_error_envelope(status: u16, body: &[u8]) -> Option<ApiFailure> {
    let parsed: ErrorEnvelope = serde_json::from_slice(body).ok()?;

    Some(
        ApiFailure::from_status(status, parsed.error.message)
            .with_error_type(parsed.error.error_type)
            .with_code(parsed.error.code.and_then(code_to_string)),
    )
}

// -- Fallback --

fn unparseable(status: u16, body: &[u8]) -> ApiFailure {
    let raw = String::from_utf8_lossy(body);
    ApiFailure::with_kind_and_status(
        ErrorKind::Unknown,
        status,
        format!("unparseable response body (status {status}): {raw}"),
    )
}

/// Apply status overrides that hold regardless of which schema matched
fn finalize(mut failure: ApiFailure, status: u16, retry_after: Option<Duration>) -> ApiFailure {
    if status == 429 && failure.kind != ErrorKind::RateLimited {
        failure.kind = ErrorKind::RateLimited;
        failure.retry_after = ErrorKind::RateLimited.default_backoff();
    }

    if let Some(delay) = retry_after
        && failure.kind.is_retryable()
    {
        failure.retry_after = Some(delay);
    }

    failure
}

fn code_to_string(code: serde_json::Value) -> Option<String> {
    match code {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
