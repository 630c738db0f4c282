#![allow(clippy::must_use_candidate, clippy::missing_errors_doc)]

//! Typed Rust HTTP client for the Mistral REST API
//!
//! Requests are validated, served from the response cache when possible,
//! sent over `reqwest`, then interpreted into typed successes or classified
//! failures. Whether failures come back as values or as `Err` is decided by
//! [`ClientConfig::raise_on_error`](mistral_config::ClientConfig).

mod client;
pub mod error;
mod transport;

pub use client::MistralClient;
pub use error::{ClientError, Result};
pub use mistral_config::{CacheConfig, ClientConfig};
pub use mistral_core::*;
