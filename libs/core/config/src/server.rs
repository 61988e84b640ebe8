use crate::{env_or_default, ConfigError, FromEnv};
use std::net::Ipv4Addr;

/// Bind configuration for the per-worker admin HTTP server
/// (health, readiness, metrics, DLQ inspection).
#[derive(Clone, Debug)]
pub struct AdminServerConfig {
    pub host: String,
    pub port: u16,
}

impl AdminServerConfig {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }

    /// Get the bind address as "host:port"
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl FromEnv for AdminServerConfig {
    /// Reads from environment variables with sensible defaults:
    /// - ADMIN_HOST: defaults to Ipv4Addr::UNSPECIFIED (0.0.0.0 - all interfaces)
    /// - ADMIN_PORT: defaults to 9090
    fn from_env() -> Result<Self, ConfigError> {
        let host = env_or_default("ADMIN_HOST", &Ipv4Addr::UNSPECIFIED.to_string());
        let port = env_or_default("ADMIN_PORT", "9090").parse().map_err(|e| {
            ConfigError::ParseError {
                key: "ADMIN_PORT".to_string(),
                details: format!("{}", e),
            }
        })?;

        Ok(Self { host, port })
    }
}

impl Default for AdminServerConfig {
    fn default() -> Self {
        Self {
            host: Ipv4Addr::UNSPECIFIED.to_string(),
            port: 9090,
        }
    }
}
