use std::time::Duration;

use serde::Deserialize;

/// In-memory response cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Whether caching is enabled
    #[serde(default)]
    pub enabled: bool,
    /// Absolute TTL in seconds; entries also expire after half this long idle
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    /// Maximum number of cached responses
    #[serde(default = "default_max_entries")]
    pub max_entries: u64,
}

impl CacheConfig {
    /// Absolute time to live
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_seconds: default_ttl_seconds(),
            max_entries: default_max_entries(),
        }
    }
}

#[allow(clippy::missing_const_for_fn)]
fn default_ttl_seconds() -> u64 {
    300
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_entries() -> u64 {
    1000
}
