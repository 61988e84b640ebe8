use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;
use serde::Serialize;

use crate::error::{PagesError, PagesResult};
use crate::models::{PageRef, PageTarget, RenderMode};

/// Access to the platform's page bookkeeping.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageStore: Send + Sync {
    /// Expand a task target into concrete pages with freshness flags.
    async fn resolve(&self, kind: PageTarget, value: &str) -> PagesResult<Vec<PageRef>>;

    /// Record a finished render so later tasks see the page as current.
    async fn mark_rendered(&self, path: &str, mode: RenderMode) -> PagesResult<()>;
}

#[derive(Serialize)]
struct ResolveRequest<'a> {
    #[serde(rename = "type")]
    kind: PageTarget,
    value: &'a str,
}

#[derive(Serialize)]
struct RenderedRequest<'a> {
    path: &'a str,
    mode: &'static str,
}

/// Page store backed by the platform's internal HTTP API.
pub struct HttpPageStore {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpPageStore {
    pub fn new(config: PlatformApiConfig) -> PagesResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PageStore for HttpPageStore {
    async fn resolve(&self, kind: PageTarget, value: &str) -> PagesResult<Vec<PageRef>> {
        let url = self.config.endpoint("/pages/resolve");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&ResolveRequest { kind, value })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PagesError::Store(format!(
                "page resolve returned {}",
                response.status()
            )));
        }

        Ok(response.json::<Vec<PageRef>>().await?)
    }

    async fn mark_rendered(&self, path: &str, mode: RenderMode) -> PagesResult<()> {
        let url = self.config.endpoint("/pages/rendered");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.token)
            .json(&RenderedRequest {
                path,
                mode: mode.as_str(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PagesError::Store(format!(
                "mark rendered returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
