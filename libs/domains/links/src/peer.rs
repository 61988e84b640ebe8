use std::time::Duration;

use async_trait::async_trait;

use crate::error::{LinksError, LinksResult};
use crate::models::ExchangeRequest;

/// How much of a probed page we keep for backlink inspection.
const MAX_PROBE_BYTES: usize = 256 * 1024;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = concat!("quill-linkbot/", env!("CARGO_PKG_VERSION"));

/// What came back from probing a page.
#[derive(Debug, Clone)]
pub struct PageProbe {
    pub status: u16,
    pub body: String,
}

impl PageProbe {
    pub fn reachable(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound HTTP to other people's sites and peer APIs.
///
/// Every method returns `Ok` for any HTTP response, whatever the status;
/// `Err` is reserved for transport failures (DNS, refused connection,
/// timeout) so callers can tell "the site answered badly" from "the
/// site is gone".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PeerClient: Send + Sync {
    /// GET a page, following redirects. The body is capped.
    async fn probe(&self, url: &str) -> LinksResult<PageProbe>;

    /// POST an exchange-links request to a peer's API. Returns the
    /// response status.
    async fn exchange(&self, peer_api: &str, request: &ExchangeRequest) -> LinksResult<u16>;

    /// POST a link update to a peer's API. Returns the response status.
    async fn push(&self, peer_api: &str, payload: &serde_json::Value) -> LinksResult<u16>;
}

/// `reqwest`-backed production client.
pub struct HttpPeerClient {
    client: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new() -> LinksResult<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> LinksResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn probe(&self, url: &str) -> LinksResult<PageProbe> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| unreachable_err(url, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| unreachable_err(url, e))?;

        Ok(PageProbe {
            status,
            body: clip(body, MAX_PROBE_BYTES),
        })
    }

    async fn exchange(&self, peer_api: &str, request: &ExchangeRequest) -> LinksResult<u16> {
        let url = join(peer_api, "/links/exchange");
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| unreachable_err(peer_api, e))?;
        Ok(response.status().as_u16())
    }

    async fn push(&self, peer_api: &str, payload: &serde_json::Value) -> LinksResult<u16> {
        let url = join(peer_api, "/links/push");
        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| unreachable_err(peer_api, e))?;
        Ok(response.status().as_u16())
    }
}

fn unreachable_err(url: &str, e: reqwest::Error) -> LinksError {
    LinksError::Unreachable {
        url: url.to_string(),
        message: e.to_string(),
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Truncate to at most `max` bytes without splitting a UTF-8 character.
fn clip(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut cut = max;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        body.truncate(cut);
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_reachable_by_status() {
        let ok = PageProbe {
            status: 204,
            body: String::new(),
        };
        assert!(ok.reachable());

        let gone = PageProbe {
            status: 404,
            body: String::new(),
        };
        assert!(!gone.reachable());
    }

    #[test]
    fn test_join_strips_trailing_slash() {
        assert_eq!(
            join("https://peer.example/api/", "/links/push"),
            "https://peer.example/api/links/push"
        );
        assert_eq!(
            join("https://peer.example/api", "/links/push"),
            "https://peer.example/api/links/push"
        );
    }

    #[test]
    fn test_clip_respects_char_boundaries() {
        let body = "aé".repeat(10); // 'é' is two bytes
        let clipped = clip(body, 4);
        assert!(clipped.len() <= 4);
        assert!(clipped.is_char_boundary(clipped.len()));
    }

    #[test]
    fn test_clip_leaves_short_bodies_alone() {
        let clipped = clip("hello".to_string(), 100);
        assert_eq!(clipped, "hello");
    }

    #[test]
    fn test_client_builds() {
        assert!(HttpPeerClient::new().is_ok());
    }
}
