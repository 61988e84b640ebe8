use chrono::{DateTime, Utc};
use core_config::{env_required, ConfigError};
use serde::{Deserialize, Serialize};

// ============ Task payloads ============

/// Check whether a blogroll link still resolves.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditTask {
    pub link_id: i64,
    /// Set when an operator triggered the audit by hand rather than the
    /// scheduler.
    #[serde(default)]
    pub manual: bool,
}

/// Introduce this site to a peer blog and record the peer locally.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectTask {
    pub peer_api: String,
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub description: Option<String>,
}

/// Deliver a link update to a peer that already knows us.
#[derive(Debug, Clone, Deserialize)]
pub struct PushTask {
    pub link_id: i64,
    pub peer_api: String,
    pub payload: serde_json::Value,
}

/// Verify a URL is alive and, optionally, that it still links back.
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorTask {
    pub url: String,
    pub link_id: Option<i64>,
    pub my_domain: Option<String>,
}

// ============ Entities and results ============

/// A blogroll link as served by the platform API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Persisted outcome of an audit run. Only written when the target
/// answered; transport failures go through the retry policy instead.
#[derive(Debug, Clone, Serialize)]
pub struct AuditOutcome {
    pub reachable: bool,
    pub http_status: u16,
    pub manual: bool,
    pub checked_at: DateTime<Utc>,
}

/// A peer blog this site exchanged links with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerLink {
    pub peer_api: String,
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub description: Option<String>,
}

/// The body POSTed to a peer's exchange endpoint; describes this site.
/// Mirrors the shape our own connect endpoint accepts.
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRequest {
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub description: Option<String>,
}

/// Persisted outcome of a push delivery.
#[derive(Debug, Clone, Serialize)]
pub struct PushDelivery {
    pub peer_api: String,
    pub http_status: u16,
    pub delivered_at: DateTime<Utc>,
}

/// Persisted outcome of a monitor run. `backlink_present` is `None`
/// when no domain was given or the page could not be read.
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub url: String,
    pub link_id: Option<i64>,
    pub reachable: bool,
    pub http_status: u16,
    pub backlink_present: Option<bool>,
    pub checked_at: DateTime<Utc>,
}

/// This site's public identity, sent to peers during link exchange.
#[derive(Debug, Clone)]
pub struct SiteIdentity {
    pub name: String,
    pub url: String,
    pub logo: Option<String>,
    pub description: Option<String>,
}

impl SiteIdentity {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            name: env_required("SITE_NAME")?,
            url: env_required("SITE_URL")?,
            logo: std::env::var("SITE_LOGO").ok(),
            description: std::env::var("SITE_DESCRIPTION").ok(),
        })
    }

    pub fn exchange_request(&self) -> ExchangeRequest {
        ExchangeRequest {
            name: self.name.clone(),
            url: self.url.clone(),
            logo: self.logo.clone(),
            description: self.description.clone(),
        }
    }
}
