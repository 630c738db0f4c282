#![allow(dead_code)]

pub mod mock_mistral;

use mistral_client::{ClientConfig, MistralClient};
use tracing_subscriber::EnvFilter;
use url::Url;

/// Install a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Configuration pointing at a mock server
pub fn config_for(base_url: &str) -> ClientConfig {
    ClientConfig::new("sk-test").with_server_url(Url::parse(base_url).unwrap())
}

/// Client with default settings pointing at a mock server
pub fn client_for(base_url: &str) -> MistralClient {
    init_tracing();
    MistralClient::new(&config_for(base_url)).unwrap()
}
