use std::time::Duration;

use crate::{env_parse_or_default, env_required, ConfigError, FromEnv};

/// Platform REST API configuration.
///
/// Task handlers load and persist their domain entities (comments,
/// posts, links, pages) through the platform's internal HTTP API
/// rather than talking to its database directly.
#[derive(Clone, Debug)]
pub struct PlatformApiConfig {
    pub base_url: String,
    pub token: String,
    pub timeout_secs: u64,
}

impl PlatformApiConfig {
    pub fn new(base_url: String, token: String) -> Self {
        Self {
            base_url,
            token,
            timeout_secs: 15,
        }
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base URL with any trailing slash removed, so endpoint paths can
    /// always be joined with a leading slash.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl FromEnv for PlatformApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: env_required("PLATFORM_API_URL")?,
            token: env_required("PLATFORM_API_TOKEN")?,
            timeout_secs: env_parse_or_default("PLATFORM_API_TIMEOUT_SECS", 15)?,
        })
    }
}
