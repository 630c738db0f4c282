use std::time::Duration;

use jiff::Timestamp;
use mistral_core::{ApiFailure, ErrorKind, TransportError};
use reqwest::header::{HeaderMap, RETRY_AFTER};

/// Classify a `reqwest` failure for the stream decoder
pub fn transport_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::timeout(err.to_string())
    } else {
        TransportError::disconnected(err.to_string())
    }
}

/// Classify a `reqwest` failure that happened before a response was read
pub fn transport_failure(err: &reqwest::Error) -> ApiFailure {
    let kind = if err.is_timeout() {
        ErrorKind::Timeout
    } else if err.is_connect() || err.is_request() || err.is_body() {
        ErrorKind::ServerTransient
    } else {
        ErrorKind::Unknown
    };

    tracing::error!(%kind, error = %err, "request transport failed");

    let failure = ApiFailure::new(kind, err.to_string());
    match err.status() {
        Some(status) => ApiFailure {
            status: Some(status.as_u16()),
            ..failure
        },
        None => failure,
    }
}

/// Server-requested retry delay from the `Retry-After` header
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(RETRY_AFTER)?.to_str().ok()?;
    parse_retry_after(value, Timestamp::now())
}

/// Delay seconds or an HTTP date, relative to `now`
fn parse_retry_after(value: &str, now: Timestamp) -> Option<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let date = jiff::fmt::rfc2822::parse(value).ok()?;
    let delay = date.timestamp().duration_since(now);
    Some(Duration::try_from(delay).unwrap_or(Duration::ZERO))
}
