use async_trait::async_trait;
use core_config::platform::PlatformApiConfig;

use crate::error::{PagesError, PagesResult};
use crate::models::RenderMode;

/// Produces the bytes for one page. Rendering itself (templates, data
/// loading) lives behind this seam; the worker only moves bytes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageRenderer: Send + Sync {
    async fn render(&self, path: &str, mode: RenderMode) -> PagesResult<Vec<u8>>;
}

/// Renderer backed by the platform's render endpoint.
pub struct HttpPageRenderer {
    client: reqwest::Client,
    config: PlatformApiConfig,
}

impl HttpPageRenderer {
    pub fn new(config: PlatformApiConfig) -> PagesResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PageRenderer for HttpPageRenderer {
    async fn render(&self, path: &str, mode: RenderMode) -> PagesResult<Vec<u8>> {
        let url = self
            .config
            .endpoint(&format!("/render/{}/{}", mode.as_str(), path));
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PagesError::Render {
                path: path.to_string(),
                message: format!("render service returned {}", response.status()),
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}
