use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;
use chrono::Utc;

use crate::error::LinksError;
use crate::handlers::is_http_url;
use crate::models::{PushDelivery, PushTask};
use crate::peer::PeerClient;
use crate::store::LinkStore;

/// Delivers a link update to a peer API and records the delivery.
pub struct PushHandler<S, P> {
    store: S,
    peer: P,
}

impl<S, P> PushHandler<S, P> {
    pub fn new(store: S, peer: P) -> Self {
        Self { store, peer }
    }
}

#[async_trait]
impl<S, P> TaskHandler for PushHandler<S, P>
where
    S: LinkStore,
    P: PeerClient,
{
    type Payload = PushTask;

    fn name(&self) -> &str {
        "link_push"
    }

    fn resource_key(&self, payload: &PushTask) -> Option<String> {
        Some(payload.peer_api.clone())
    }

    async fn handle(&self, task: PushTask) -> Result<TaskOutcome, TaskError> {
        if task.link_id <= 0 {
            return Err(TaskError::payload(format!(
                "link_id must be positive, got {}",
                task.link_id
            )));
        }
        if !is_http_url(&task.peer_api) {
            return Err(TaskError::payload(format!(
                "peer_api must be an absolute http(s) URL, got '{}'",
                task.peer_api
            )));
        }

        let Some(link) = self.store.get_link(task.link_id).await? else {
            tracing::info!(link_id = task.link_id, "Link gone, nothing to push");
            return Ok(TaskOutcome::skipped("link not found"));
        };

        let status = self.peer.push(&task.peer_api, &task.payload).await?;
        if !(200..300).contains(&status) {
            return Err(LinksError::PeerRejected {
                peer_api: task.peer_api,
                status,
            }
            .into());
        }

        let delivery = PushDelivery {
            peer_api: task.peer_api,
            http_status: status,
            delivered_at: Utc::now(),
        };
        self.store.save_push(link.id, &delivery).await?;

        tracing::info!(
            link_id = link.id,
            peer_api = %delivery.peer_api,
            http_status = status,
            "Link update pushed"
        );
        Ok(TaskOutcome::Completed)
    }
}
