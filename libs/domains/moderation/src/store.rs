use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;
use reqwest::StatusCode;

use crate::error::{ModerationError, ModerationResult};
use crate::models::{Comment, ModerationVerdict};

/// Access to the platform's comment records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentStore: Send + Sync {
    /// Fetch a comment by id. `None` when the comment no longer exists.
    async fn get_comment(&self, id: i64) -> ModerationResult<Option<Comment>>;

    /// Persist the verdict for a comment.
    async fn save_verdict(&self, id: i64, verdict: &ModerationVerdict) -> ModerationResult<()>;
}

/// Comment store backed by the platform's internal HTTP API.
pub struct HttpCommentStore {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpCommentStore {
    pub fn new(config: PlatformApiConfig) -> ModerationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CommentStore for HttpCommentStore {
    async fn get_comment(&self, id: i64) -> ModerationResult<Option<Comment>> {
        let url = self.config.endpoint(&format!("/comments/{}", id));
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
            return Err(ModerationError::Store(format!(
                "comment lookup returned {}",
                response.status()
            )));
        }

        Ok(Some(response.json::<Comment>().await?))
    }

    async fn save_verdict(&self, id: i64, verdict: &ModerationVerdict) -> ModerationResult<()> {
        let url = self.config.endpoint(&format!("/comments/{}/moderation", id));
        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.token)
            .json(verdict)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ModerationError::Store(format!(
                "verdict save returned {}",
                response.status()
            )));
        }

        tracing::debug!(comment_id = id, "Persisted moderation verdict");
        Ok(())
    }
}
