//! Prometheus metrics for queue workers.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::time::Duration;
use tracing::info;

static PROMETHEUS_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Initialize Prometheus metrics.
///
/// Call this once at startup. Subsequent calls are no-ops.
pub fn init_metrics() {
    let _ = PROMETHEUS_HANDLE.get_or_init(|| {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("Failed to install Prometheus recorder");
        info!("Prometheus metrics initialized");
        handle
    });
}

/// Render metrics in Prometheus exposition format.
pub fn render_metrics() -> String {
    PROMETHEUS_HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_default()
}

/// Per-worker metrics helper.
#[derive(Clone)]
pub struct WorkerMetrics {
    worker_name: String,
}

impl WorkerMetrics {
    pub fn new(worker_name: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
        }
    }

    /// Record a task that completed its side effect.
    pub fn task_completed(&self, duration: Duration) {
        counter!(
            "amqp_worker_tasks_total",
            "worker" => self.worker_name.clone(),
            "outcome" => "completed"
        )
        .increment(1);

        histogram!(
            "amqp_worker_task_duration_seconds",
            "worker" => self.worker_name.clone()
        )
        .record(duration.as_secs_f64());
    }

    /// Record a task acked as an idempotent no-op.
    pub fn task_skipped(&self) {
        counter!(
            "amqp_worker_tasks_total",
            "worker" => self.worker_name.clone(),
            "outcome" => "skipped"
        )
        .increment(1);
    }

    /// Record a message dropped because its body was not usable.
    pub fn task_payload_error(&self) {
        counter!(
            "amqp_worker_tasks_total",
            "worker" => self.worker_name.clone(),
            "outcome" => "payload_error"
        )
        .increment(1);
    }

    /// Record a retry republish.
    pub fn task_retried(&self) {
        counter!(
            "amqp_worker_retries_total",
            "worker" => self.worker_name.clone()
        )
        .increment(1);
    }

    /// Record a message routed to the dead-letter queue.
    pub fn task_dead_lettered(&self, reason: &str) {
        counter!(
            "amqp_worker_dead_letters_total",
            "worker" => self.worker_name.clone(),
            "reason" => reason.to_string()
        )
        .increment(1);
    }

    /// Record a message short-circuited by an open resource circuit.
    pub fn circuit_short_circuit(&self) {
        counter!(
            "amqp_worker_circuit_open_total",
            "worker" => self.worker_name.clone()
        )
        .increment(1);
    }

    /// Record a consume-session teardown and rebuild.
    pub fn session_rebuilt(&self) {
        counter!(
            "amqp_worker_session_rebuilds_total",
            "worker" => self.worker_name.clone()
        )
        .increment(1);
    }

    /// Update the queue depth gauge from a probe round-trip.
    pub fn queue_depth(&self, queue: &str, depth: u32) {
        gauge!(
            "amqp_worker_queue_depth",
            "worker" => self.worker_name.clone(),
            "queue" => queue.to_string()
        )
        .set(depth as f64);
    }
}
