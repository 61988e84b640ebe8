//! Health endpoints and worker status tracking.
//!
//! Reusable Axum handlers for:
//! - Liveness probes (`/health`, `/healthz`)
//! - Readiness probes (`/ready`, `/readyz`)
//! - Prometheus metrics (`/metrics`)
//! - DLQ admin endpoints (`/admin/dlq/*`)
//!
//! The worker loop updates a shared [`WorkerStatus`]; the HTTP surface
//! only reads it, so a wedged consumer cannot wedge the probes.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use crate::dlq::DlqManager;
use crate::metrics;

/// Supervisor-visible health of the consume loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    /// Session is up and the last probe round-tripped.
    Healthy,
    /// Session lost; the supervisor is rebuilding it.
    Degraded,
}

impl HealthState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
        }
    }
}

/// Mutable worker state shared between the consume loop and the admin
/// server.
pub struct WorkerStatus {
    worker_name: String,
    version: String,
    state: RwLock<HealthState>,
    ready: AtomicBool,
    rebuilds: AtomicU64,
    last_probe_at: RwLock<Option<DateTime<Utc>>>,
    started_at: Instant,
}

impl WorkerStatus {
    pub fn new(worker_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
            version: version.into(),
            state: RwLock::new(HealthState::Degraded),
            ready: AtomicBool::new(false),
            rebuilds: AtomicU64::new(0),
            last_probe_at: RwLock::new(None),
            started_at: Instant::now(),
        }
    }

    pub fn worker_name(&self) -> &str {
        &self.worker_name
    }

    pub fn mark_healthy(&self) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = HealthState::Healthy;
    }

    pub fn mark_degraded(&self) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = HealthState::Degraded;
    }

    pub fn health(&self) -> HealthState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    /// Readiness flips on once the first session is built and stays on:
    /// later rebuilds degrade health but do not fail readiness.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn record_rebuild(&self) {
        self.rebuilds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rebuild_count(&self) -> u64 {
        self.rebuilds.load(Ordering::Relaxed)
    }

    pub fn record_probe(&self) {
        *self.last_probe_at.write().unwrap_or_else(|e| e.into_inner()) = Some(Utc::now());
    }

    pub fn last_probe_at(&self) -> Option<DateTime<Utc>> {
        *self.last_probe_at.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    fn snapshot(&self) -> Value {
        json!({
            "status": self.health().as_str(),
            "worker": self.worker_name,
            "version": self.version,
            "uptime_seconds": self.uptime_seconds(),
            "session_rebuilds": self.rebuild_count(),
            "last_probe_at": self.last_probe_at(),
        })
    }
}

/// Shared state for the admin HTTP surface.
#[derive(Clone)]
pub struct AdminState {
    pub status: Arc<WorkerStatus>,
    pub dlq: DlqManager,
}

/// Liveness probe handler.
///
/// Reports 503 while the consume session is degraded so orchestrators
/// can see (and alert on) a worker stuck in rebuild.
pub async fn health_handler(State(state): State<AdminState>) -> impl IntoResponse {
    let body = Json(state.status.snapshot());
    match state.status.health() {
        HealthState::Healthy => (StatusCode::OK, body),
        HealthState::Degraded => (StatusCode::SERVICE_UNAVAILABLE, body),
    }
}

/// Readiness probe handler.
///
/// Ready once the first consume session has been built.
pub async fn ready_handler(State(state): State<AdminState>) -> impl IntoResponse {
    if state.status.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready" })),
        )
    }
}

/// Prometheus metrics endpoint handler.
pub async fn metrics_handler() -> impl IntoResponse {
    let output = metrics::render_metrics();
    if output.is_empty() {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            "Metrics not initialized. Call metrics::init_metrics() at startup.".to_string(),
        )
    } else {
        (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            output,
        )
    }
}

/// Query parameters for the DLQ redrive endpoint.
#[derive(Debug, Deserialize)]
pub struct RedriveParams {
    /// Number of messages to move back (default: 10, max: 100).
    #[serde(default = "default_redrive_count")]
    pub count: usize,
}

fn default_redrive_count() -> usize {
    10
}

/// `GET /admin/dlq/stats` - dead-letter queue depth.
pub async fn dlq_stats_handler(
    State(state): State<AdminState>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    match state.dlq.stats().await {
        Ok(stats) => Ok(Json(stats)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

/// `POST /admin/dlq/redrive?count=10` - move messages back to the
/// primary queue with a fresh retry budget.
pub async fn dlq_redrive_handler(
    State(state): State<AdminState>,
    Query(params): Query<RedriveParams>,
) -> Result<impl IntoResponse, (StatusCode, Json<Value>)> {
    let count = params.count.min(100);

    match state.dlq.redrive(count).await {
        Ok(report) => Ok(Json(report)),
        Err(e) => Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        )),
    }
}

/// Build the admin router: health, readiness, metrics, and DLQ admin.
pub fn admin_router(state: AdminState) -> axum::Router {
    use axum::routing::{get, post};

    axum::Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/readyz", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .route("/admin/dlq/stats", get(dlq_stats_handler))
        .route("/admin/dlq/redrive", post(dlq_redrive_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_starts_degraded_and_not_ready() {
        let status = WorkerStatus::new("moderation", "0.1.0");
        assert_eq!(status.health(), HealthState::Degraded);
        assert!(!status.is_ready());
    }

    #[test]
    fn test_status_transitions() {
        let status = WorkerStatus::new("moderation", "0.1.0");

        status.mark_ready();
        status.mark_healthy();
        assert_eq!(status.health(), HealthState::Healthy);
        assert!(status.is_ready());

        status.mark_degraded();
        assert_eq!(status.health(), HealthState::Degraded);
        // Readiness is sticky across rebuilds.
        assert!(status.is_ready());
    }

    #[test]
    fn test_rebuild_and_probe_bookkeeping() {
        let status = WorkerStatus::new("mail", "0.1.0");
        assert_eq!(status.rebuild_count(), 0);
        assert!(status.last_probe_at().is_none());

        status.record_rebuild();
        status.record_rebuild();
        status.record_probe();

        assert_eq!(status.rebuild_count(), 2);
        assert!(status.last_probe_at().is_some());
    }

    #[test]
    fn test_snapshot_shape() {
        let status = WorkerStatus::new("pages", "1.2.3");
        status.mark_healthy();

        let snapshot = status.snapshot();
        assert_eq!(snapshot["status"], "healthy");
        assert_eq!(snapshot["worker"], "pages");
        assert_eq!(snapshot["version"], "1.2.3");
        assert_eq!(snapshot["session_rebuilds"], 0);
    }
}
