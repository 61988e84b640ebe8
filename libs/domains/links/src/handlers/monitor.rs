use amqp_worker::{TaskError, TaskHandler, TaskOutcome};
use async_trait::async_trait;
use chrono::Utc;

use crate::handlers::is_http_url;
use crate::models::{MonitorReport, MonitorTask};
use crate::peer::PeerClient;
use crate::store::LinkStore;

/// Verifies a URL is alive and, when a domain is given, that the page
/// still links back to it.
pub struct MonitorHandler<S, P> {
    store: S,
    peer: P,
}

impl<S, P> MonitorHandler<S, P> {
    pub fn new(store: S, peer: P) -> Self {
        Self { store, peer }
    }
}

#[async_trait]
impl<S, P> TaskHandler for MonitorHandler<S, P>
where
    S: LinkStore,
    P: PeerClient,
{
    type Payload = MonitorTask;

    fn name(&self) -> &str {
        "link_monitor"
    }

    fn resource_key(&self, payload: &MonitorTask) -> Option<String> {
        Some(payload.url.clone())
    }

    async fn handle(&self, task: MonitorTask) -> Result<TaskOutcome, TaskError> {
        if !is_http_url(&task.url) {
            return Err(TaskError::payload(format!(
                "url must be an absolute http(s) URL, got '{}'",
                task.url
            )));
        }

        let probe = self.peer.probe(&task.url).await?;

        let backlink_present = match (&task.my_domain, probe.reachable()) {
            (Some(domain), true) => Some(contains_domain(&probe.body, domain)),
            _ => None,
        };

        let report = MonitorReport {
            url: task.url,
            link_id: task.link_id,
            reachable: probe.reachable(),
            http_status: probe.status,
            backlink_present,
            checked_at: Utc::now(),
        };
        self.store.save_monitor(&report).await?;

        tracing::info!(
            url = %report.url,
            http_status = report.http_status,
            reachable = report.reachable,
            backlink = ?report.backlink_present,
            "Link monitored"
        );
        Ok(TaskOutcome::Completed)
    }
}

/// Loose check: a href or a textual mention both count as a backlink.
fn contains_domain(body: &str, domain: &str) -> bool {
    body.to_lowercase().contains(&domain.to_lowercase())
}
