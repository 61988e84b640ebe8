use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;
use reqwest::StatusCode;

use crate::error::{SummariesError, SummariesResult};
use crate::models::{Post, PostSummary};

/// Access to the platform's post records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Fetch a post by id. `None` when the post no longer exists.
    async fn get_post(&self, id: i64) -> SummariesResult<Option<Post>>;

    /// Persist the generated summary for a post.
    async fn save_summary(&self, id: i64, summary: &PostSummary) -> SummariesResult<()>;
}

/// Post store backed by the platform's internal HTTP API.
pub struct HttpPostStore {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpPostStore {
    pub fn new(config: PlatformApiConfig) -> SummariesResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PostStore for HttpPostStore {
    async fn get_post(&self, id: i64) -> SummariesResult<Option<Post>> {
        let url = self.config.endpoint(&format!("/posts/{}", id));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SummariesError::Store(format!(
                "post lookup returned {}",
                response.status()
            )));
        }

        Ok(Some(response.json::<Post>().await?))
    }

    async fn save_summary(&self, id: i64, summary: &PostSummary) -> SummariesResult<()> {
        let url = self.config.endpoint(&format!("/posts/{}/summary", id));
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .json(summary)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SummariesError::Store(format!(
                "summary save returned {}",
                response.status()
            )));
        }

        tracing::debug!(post_id = id, "Persisted post summary");
        Ok(())
    }
}
