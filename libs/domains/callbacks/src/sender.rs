use std::time::Duration;

use async_trait::async_trait;

use crate::error::{CallbacksError, CallbacksResult};
use crate::models::CallbackEnvelope;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("quill-callbacks/", env!("CARGO_PKG_VERSION"));

/// Delivers one callback to a subscriber endpoint.
///
/// `Ok` carries the HTTP status whatever it is; `Err` is reserved for
/// transport failures.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CallbackSender: Send + Sync {
    async fn deliver(
        &self,
        url: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> CallbacksResult<u16>;
}

/// `reqwest`-backed production sender.
pub struct HttpCallbackSender {
    client: reqwest::Client,
}

impl HttpCallbackSender {
    pub fn new() -> CallbacksResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> CallbacksResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CallbackSender for HttpCallbackSender {
    async fn deliver(
        &self,
        url: &str,
        event: &str,
        payload: &serde_json::Value,
    ) -> CallbacksResult<u16> {
        let response = self
            .client
            .post(url)
            .header("X-Quill-Event", event)
            .json(&CallbackEnvelope { event, payload })
            .send()
            .await
            .map_err(|e| CallbacksError::Unreachable {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(response.status().as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sender_builds() {
        assert!(HttpCallbackSender::new().is_ok());
    }
}
