use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;

use crate::error::LinksError;
use crate::handlers::is_http_url;
use crate::models::{ConnectTask, PeerLink, SiteIdentity};
use crate::peer::PeerClient;
use crate::store::LinkStore;

/// Introduces this site to a peer blog and records the peer locally.
pub struct ConnectHandler<S, P> {
    store: S,
    peer: P,
    site: SiteIdentity,
}

impl<S, P> ConnectHandler<S, P> {
    pub fn new(store: S, peer: P, site: SiteIdentity) -> Self {
        Self { store, peer, site }
    }
}

#[async_trait]
impl<S, P> TaskHandler for ConnectHandler<S, P>
where
    S: LinkStore,
    P: PeerClient,
{
    type Payload = ConnectTask;

    fn name(&self) -> &str {
        "link_connect"
    }

    fn resource_key(&self, payload: &ConnectTask) -> Option<String> {
        Some(payload.peer_api.clone())
    }

    async fn handle(&self, task: ConnectTask) -> Result<TaskOutcome, TaskError> {
        if !is_http_url(&task.peer_api) {
            return Err(TaskError::payload(format!(
                "peer_api must be an absolute http(s) URL, got '{}'",
                task.peer_api
            )));
        }
        if task.name.trim().is_empty() {
            return Err(TaskError::payload("peer name must not be empty"));
        }

        let status = self
            .peer
            .exchange(&task.peer_api, &self.site.exchange_request())
            .await?;

        // 409 means the peer already has us on file; still record them.
        if !(200..300).contains(&status) && status != 409 {
            return Err(LinksError::PeerRejected {
                peer_api: task.peer_api,
                status,
            }
            .into());
        }

        let peer = PeerLink {
            peer_api: task.peer_api,
            name: task.name,
            url: task.url,
            logo: task.logo,
            description: task.description,
        };
        self.store.upsert_peer(&peer).await?;

        tracing::info!(
            peer_api = %peer.peer_api,
            peer_name = %peer.name,
            exchange_status = status,
            "Peer link connected"
        );
        Ok(TaskOutcome::Completed)
    }
}
