use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{NotificationsError, NotificationsResult};

/// Delivery ledger for mails that carry a `mail_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MailStore: Send + Sync {
    /// Whether this mail id was already delivered.
    async fn was_sent(&self, mail_id: &str) -> NotificationsResult<bool>;

    /// Record a completed delivery.
    async fn mark_sent(&self, mail_id: &str) -> NotificationsResult<()>;
}

#[derive(Deserialize)]
struct MailStatus {
    sent: bool,
}

/// Mail ledger backed by the platform's internal HTTP API.
pub struct HttpMailStore {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpMailStore {
    pub fn new(config: PlatformApiConfig) -> NotificationsResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl MailStore for HttpMailStore {
    async fn was_sent(&self, mail_id: &str) -> NotificationsResult<bool> {
        let url = self.config.endpoint(&format!("/mail/{}/status", mail_id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        // An unknown mail id has simply never been delivered.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(NotificationsError::Store(format!(
                "mail status lookup returned {}",
                response.status()
            )));
        }

        Ok(response.json::<MailStatus>().await?.sent)
    }

    async fn mark_sent(&self, mail_id: &str) -> NotificationsResult<()> {
        let url = self.config.endpoint(&format!("/mail/{}/sent", mail_id));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotificationsError::Store(format!(
                "mark sent returned {}",
                response.status()
            )));
        }

        tracing::debug!(mail_id = %mail_id, "Marked mail delivered");
        Ok(())
    }
}
