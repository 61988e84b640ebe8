use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;
use chrono::Utc;

use crate::models::{AuditOutcome, AuditTask};
use crate::peer::PeerClient;
use crate::store::LinkStore;

/// Checks whether a blogroll link still resolves and records the result.
///
/// An HTTP response of any status is a completed audit (a 404 is an
/// answer); only transport failures go through the retry policy. The
/// audit URL is not in the payload, so breaker attribution happens on
/// the failure side once the link has been fetched.
pub struct AuditHandler<S, P> {
    store: S,
    peer: P,
}

impl<S, P> AuditHandler<S, P> {
    pub fn new(store: S, peer: P) -> Self {
        Self { store, peer }
    }
}

#[async_trait]
impl<S, P> TaskHandler for AuditHandler<S, P>
where
    S: LinkStore,
    P: PeerClient,
{
    type Payload = AuditTask;

    fn name(&self) -> &str {
        "link_audit"
    }

    async fn handle(&self, task: AuditTask) -> Result<TaskOutcome, TaskError> {
        if task.link_id <= 0 {
            return Err(TaskError::payload(format!(
                "link_id must be positive, got {}",
                task.link_id
            )));
        }

        let Some(link) = self.store.get_link(task.link_id).await? else {
            tracing::info!(link_id = task.link_id, "Link gone, nothing to audit");
            return Ok(TaskOutcome::skipped("link not found"));
        };

        let probe = self.peer.probe(&link.url).await?;

        let outcome = AuditOutcome {
            reachable: probe.reachable(),
            http_status: probe.status,
            manual: task.manual,
            checked_at: Utc::now(),
        };
        self.store.save_audit(link.id, &outcome).await?;

        tracing::info!(
            link_id = link.id,
            url = %link.url,
            http_status = outcome.http_status,
            reachable = outcome.reachable,
            "Link audited"
        );
        Ok(TaskOutcome::Completed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Link;
    use crate::peer::{MockPeerClient, PageProbe};
    use crate::store::MockLinkStore;

    fn link(id: i64) -> Link {
        Link {
            id,
            name: "friend".to_string(),
            url: "https://friend.example".to_string(),
        }
    }

    fn task(link_id: i64) -> AuditTask {
        AuditTask {
            link_id,
            manual: false,
        }
    }

    #[tokio::test]
    async fn test_audits_reachable_link() {
        let mut store = MockLinkStore::new();
        store.expect_get_link().returning(|id| Ok(Some(link(id))));
        store
            .expect_save_audit()
            .withf(|id, outcome| *id == 12 && outcome.reachable && outcome.http_status == 200)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut peer = MockPeerClient::new();
        peer.expect_probe().returning(|_| {
            Ok(PageProbe {
                status: 200,
                body: "<html></html>".to_string(),
            })
        });

        let handler = AuditHandler::new(store, peer);
        let outcome = handler.handle(task(12)).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_http_error_status_is_a_completed_audit() {
        let mut store = MockLinkStore::new();
        store.expect_get_link().returning(|id| Ok(Some(link(id))));
        store
            .expect_save_audit()
            .withf(|_, outcome| !outcome.reachable && outcome.http_status == 404)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut peer = MockPeerClient::new();
        peer.expect_probe().returning(|_| {
            Ok(PageProbe {
                status: 404,
                body: String::new(),
            })
        });

        let handler = AuditHandler::new(store, peer);
        let outcome = handler.handle(task(12)).await.unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }

    #[tokio::test]
    async fn test_missing_link_is_skipped() {
        let mut store = MockLinkStore::new();
        store.expect_get_link().returning(|_| Ok(None));
        store.expect_save_audit().times(0);

        let handler = AuditHandler::new(store, MockPeerClient::new());
        let outcome = handler.handle(task(404)).await.unwrap();
        assert!(matches!(outcome, TaskOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_transport_failure_is_retryable_and_attributed() {
        let mut store = MockLinkStore::new();
        store.expect_get_link().returning(|id| Ok(Some(link(id))));
        store.expect_save_audit().times(0);

        let mut peer = MockPeerClient::new();
        peer.expect_probe().returning(|url| {
            Err(crate::error::LinksError::Unreachable {
                url: url.to_string(),
                message: "connection refused".to_string(),
            })
        });

        let handler = AuditHandler::new(store, peer);
        let err = handler.handle(task(12)).await.unwrap_err();
        assert!(!err.is_permanent());
        assert_eq!(err.resource(), Some("https://friend.example"));
    }

    #[tokio::test]
    async fn test_invalid_link_id_is_payload_error() {
        let handler = AuditHandler::new(MockLinkStore::new(), MockPeerClient::new());
        let err = handler.handle(task(0)).await.unwrap_err();
        assert!(err.is_permanent());
    }

    #[tokio::test]
    async fn test_manual_flag_is_persisted() {
        let mut store = MockLinkStore::new();
        store.expect_get_link().returning(|id| Ok(Some(link(id))));
        store
            .expect_save_audit()
            .withf(|_, outcome| outcome.manual)
            .times(1)
            .returning(|_, _| Ok(()));

        let mut peer = MockPeerClient::new();
        peer.expect_probe().returning(|_| {
            Ok(PageProbe {
                status: 200,
                body: String::new(),
            })
        });

        let handler = AuditHandler::new(store, peer);
        let outcome = handler
            .handle(AuditTask {
                link_id: 12,
                manual: true,
            })
            .await
            .unwrap();
        assert_eq!(outcome, TaskOutcome::Completed);
    }
}
