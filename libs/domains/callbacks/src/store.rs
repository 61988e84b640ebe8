use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{CallbacksError, CallbacksResult};

/// Delivery ledger for callbacks that carry a `callback_id`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallbackStore: Send + Sync {
    /// Whether this callback id was already delivered.
    async fn was_delivered(&self, callback_id: &str) -> CallbacksResult<bool>;

    /// Record a completed delivery.
    async fn mark_delivered(&self, callback_id: &str) -> CallbacksResult<()>;
}

#[derive(Deserialize)]
struct CallbackStatus {
    delivered: bool,
}

/// Callback ledger backed by the platform's internal HTTP API.
pub struct HttpCallbackStore {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpCallbackStore {
    pub fn new(config: PlatformApiConfig) -> CallbacksResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CallbackStore for HttpCallbackStore {
    async fn was_delivered(&self, callback_id: &str) -> CallbacksResult<bool> {
        let url = self
            .config
            .endpoint(&format!("/callbacks/{}/status", callback_id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !response.status().is_success() {
            return Err(CallbacksError::Store(format!(
                "callback status lookup returned {}",
                response.status()
            )));
        }

        Ok(response.json::<CallbackStatus>().await?.delivered)
    }

    async fn mark_delivered(&self, callback_id: &str) -> CallbacksResult<()> {
        let url = self
            .config
            .endpoint(&format!("/callbacks/{}/delivered", callback_id));
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(CallbacksError::Store(format!(
                "mark delivered returned {}",
                response.status()
            )));
        }

        tracing::debug!(callback_id = %callback_id, "Marked callback delivered");
        Ok(())
    }
}
