use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;
use reqwest::StatusCode;

use crate::error::{LinksError, LinksResult};
use crate::models::{AuditOutcome, Link, MonitorReport, PeerLink, PushDelivery};

/// Access to the platform's link records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// Fetch a link by id. `None` when the link no longer exists.
    async fn get_link(&self, id: i64) -> LinksResult<Option<Link>>;

    /// Persist the outcome of an audit run.
    async fn save_audit(&self, id: i64, outcome: &AuditOutcome) -> LinksResult<()>;

    /// Create or update the record for a peer blog, keyed by its API URL.
    async fn upsert_peer(&self, peer: &PeerLink) -> LinksResult<()>;

    /// Persist the outcome of a push delivery.
    async fn save_push(&self, id: i64, delivery: &PushDelivery) -> LinksResult<()>;

    /// Persist the outcome of a monitor run.
    async fn save_monitor(&self, report: &MonitorReport) -> LinksResult<()>;
}

/// Link store backed by the platform's internal HTTP API.
pub struct HttpLinkStore {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpLinkStore {
    pub fn new(config: PlatformApiConfig) -> LinksResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }

    fn check(&self, what: &str, status: StatusCode) -> LinksResult<()> {
        if status.is_success() {
            Ok(())
        } else {
            Err(LinksError::Store(format!("{} returned {}", what, status)))
        }
    }
}

#[async_trait]
impl LinkStore for HttpLinkStore {
    async fn get_link(&self, id: i64) -> LinksResult<Option<Link>> {
        let url = self.config.endpoint(&format!("/links/{}", id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        self.check("link lookup", response.status())?;
        Ok(Some(response.json::<Link>().await?))
    }

    async fn save_audit(&self, id: i64, outcome: &AuditOutcome) -> LinksResult<()> {
        let url = self.config.endpoint(&format!("/links/{}/audit", id));
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .json(outcome)
            .send()
            .await?;
        self.check("audit save", response.status())
    }

    async fn upsert_peer(&self, peer: &PeerLink) -> LinksResult<()> {
        let url = self.config.endpoint("/links/peers");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(peer)
            .send()
            .await?;
        self.check("peer upsert", response.status())
    }

    async fn save_push(&self, id: i64, delivery: &PushDelivery) -> LinksResult<()> {
        let url = self.config.endpoint(&format!("/links/{}/push", id));
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .json(delivery)
            .send()
            .await?;
        self.check("push save", response.status())
    }

    async fn save_monitor(&self, report: &MonitorReport) -> LinksResult<()> {
        let url = self.config.endpoint("/links/monitor");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(report)
            .send()
            .await?;
        self.check("monitor save", response.status())
    }
}
