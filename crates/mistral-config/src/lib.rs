#![allow(clippy::must_use_candidate)]

//! Configuration for the Mistral REST client

mod cache;
mod env;
mod loader;

use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

pub use cache::CacheConfig;

/// Client configuration
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Bearer token sent with every request
    pub api_key: SecretString,
    /// Base URL of the API
    #[serde(default = "default_server_url")]
    pub server_url: Url,
    /// Request timeout as a human duration (e.g. `"30s"`, `"2m"`)
    #[serde(default = "default_timeout")]
    pub timeout: String,
    /// Return failures as `Err` instead of `Ok(InterpretedResponse::Failure)`
    #[serde(default)]
    pub raise_on_error: bool,
    /// Validate requests before sending them
    #[serde(default = "default_true")]
    pub validate_requests: bool,
    /// Custom `User-Agent` header
    #[serde(default)]
    pub user_agent: Option<String>,
    /// Response cache
    #[serde(default)]
    pub cache: CacheConfig,
}

impl ClientConfig {
    /// Configuration with defaults for everything but the key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            server_url: default_server_url(),
            timeout: default_timeout(),
            raise_on_error: false,
            validate_requests: true,
            user_agent: None,
            cache: CacheConfig::default(),
        }
    }

    #[must_use]
    pub fn with_server_url(mut self, server_url: Url) -> Self {
        self.server_url = server_url;
        self
    }

    #[must_use]
    pub fn with_raise_on_error(mut self, raise: bool) -> Self {
        self.raise_on_error = raise;
        self
    }

    #[must_use]
    pub fn with_validate_requests(mut self, validate: bool) -> Self {
        self.validate_requests = validate;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: impl Into<String>) -> Self {
        self.timeout = timeout.into();
        self
    }
}

const DEFAULT_SERVER_URL: &str = "https://api.mistral.ai";

fn default_server_url() -> Url {
    Url::parse(DEFAULT_SERVER_URL).expect("valid default URL")
}

fn default_timeout() -> String {
    "120s".to_owned()
}

#[allow(clippy::missing_const_for_fn)]
fn default_true() -> bool {
    true
}
