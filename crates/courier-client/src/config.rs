//! Client configuration loading
//!
//! A TOML file describes the base URL, timeouts, and static header
//! injections. Validation happens at load time so a bad config fails fast
//! rather than at the first request.

use std::path::Path;

use reqwest::Method;
use serde::Deserialize;

use crate::adapt::HeaderInjection;
use crate::endpoint::Endpoint;

/// Client configuration.
#[derive(Debug, Deserialize)]
pub struct ClientConfig {
    /// Base URL every endpoint path is joined onto
    pub base_url: String,
    /// Per-attempt transport timeout
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// How long a queued 401 waits for a stalled token refresh
    #[serde(default = "default_refresh_timeout")]
    pub refresh_timeout_secs: u64,
    /// Static headers injected into every request
    #[serde(default)]
    pub headers: Vec<HeaderInjection>,
}

fn default_timeout() -> u64 {
    30
}

fn default_refresh_timeout() -> u64 {
    30
}

impl ClientConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&contents)?;

        if !config.base_url.starts_with("http://") && !config.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                config.base_url
            )));
        }
        if config.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if config.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Build an endpoint descriptor against this config's base URL.
    pub fn endpoint(&self, method: Method, path: impl Into<String>) -> Endpoint {
        Endpoint::new(method, self.base_url.clone(), path)
    }
}
