use std::path::Path;
use std::time::Duration;

use secrecy::ExposeSecret;

use crate::ClientConfig;

impl ClientConfig {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, expansion or parsing
    /// fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns an error on an empty key, an unparseable or zero timeout, or
    /// an enabled cache with no lifetime or capacity
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_key.expose_secret().trim().is_empty() {
            anyhow::bail!("api_key must not be empty");
        }

        if self.request_timeout()?.is_zero() {
            anyhow::bail!("timeout must be greater than 0");
        }

        if self.cache.enabled {
            if self.cache.ttl_seconds == 0 {
                anyhow::bail!("cache.ttl_seconds must be greater than 0");
            }
            if self.cache.max_entries == 0 {
                anyhow::bail!("cache.max_entries must be greater than 0");
            }
        }

        Ok(())
    }

    /// Parsed request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is not a duration string
    pub fn request_timeout(&self) -> anyhow::Result<Duration> {
        duration_str::parse(&self.timeout).map_err(|e| anyhow::anyhow!("invalid timeout '{}': {e}", self.timeout))
    }
}
