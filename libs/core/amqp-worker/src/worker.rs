//! The worker supervisor and per-delivery processing ladder.
//!
//! An [`AmqpWorker`] wraps one [`TaskHandler`] and owns everything around
//! it: topology declaration, the consume session, bounded-wait polling,
//! periodic broker probes, retry/dead-letter disposition, and the
//! per-resource circuit breaker. Handler failures never escape the ladder;
//! only broker-session loss (handled by rebuilding) or a non-transient
//! engine error can end `run`.

use crate::breaker::{BreakerConfig, ResourceCircuitBreaker};
use crate::config::WorkerConfig;
use crate::connection::ChannelProvider;
use crate::consumer::QueueConsumer;
use crate::error::{TaskError, WorkerError};
use crate::handler::{TaskHandler, TaskOutcome};
use crate::health::WorkerStatus;
use crate::metrics::WorkerMetrics;
use crate::retry::{DeadLetterReason, Disposition, RetryPolicy};
use crate::topology::QueueTopology;
use futures::FutureExt;
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::Channel;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// A self-healing queue worker around one task handler.
pub struct AmqpWorker<H: TaskHandler> {
    handler: H,
    provider: Arc<ChannelProvider>,
    topology: QueueTopology,
    config: WorkerConfig,
    policy: RetryPolicy,
    breaker: Arc<ResourceCircuitBreaker>,
    status: Arc<WorkerStatus>,
    metrics: WorkerMetrics,
}

impl<H: TaskHandler> AmqpWorker<H> {
    pub fn new(
        handler: H,
        provider: Arc<ChannelProvider>,
        topology: QueueTopology,
        config: WorkerConfig,
    ) -> Self {
        let policy = RetryPolicy::new(config.max_retries);
        let metrics = WorkerMetrics::new(config.worker_name.as_str());
        let status = Arc::new(WorkerStatus::new(
            config.worker_name.as_str(),
            env!("CARGO_PKG_VERSION"),
        ));

        Self {
            handler,
            provider,
            topology,
            config,
            policy,
            breaker: Arc::new(ResourceCircuitBreaker::new(BreakerConfig::default())),
            status,
            metrics,
        }
    }

    /// Inject a shared circuit breaker (e.g. tuned thresholds, or one
    /// shared across workers in the same process).
    pub fn with_breaker(mut self, breaker: Arc<ResourceCircuitBreaker>) -> Self {
        self.breaker = breaker;
        self
    }

    /// Inject a shared status tracker so the admin server observes this
    /// worker.
    pub fn with_status(mut self, status: Arc<WorkerStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn status(&self) -> Arc<WorkerStatus> {
        Arc::clone(&self.status)
    }

    pub fn breaker(&self) -> Arc<ResourceCircuitBreaker> {
        Arc::clone(&self.breaker)
    }

    pub fn topology(&self) -> &QueueTopology {
        &self.topology
    }

    /// Run until the shutdown signal flips.
    ///
    /// The first session build must succeed; a worker that cannot reach
    /// the broker at startup fails fast for the operator. After that,
    /// session loss degrades health and rebuilds forever.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) -> Result<(), WorkerError> {
        info!(
            worker = %self.config.worker_name,
            queue = %self.topology.queue,
            exchange = %self.topology.exchange,
            prefetch = self.config.prefetch,
            max_retries = self.policy.max_retries(),
            "Starting worker"
        );

        let mut first_session = true;

        loop {
            if *shutdown.borrow() {
                break;
            }

            let (channel, consumer) = match self.build_session().await {
                Ok(session) => session,
                Err(e) if first_session => {
                    error!(
                        worker = %self.config.worker_name,
                        error = %e,
                        "Could not build the first consume session, refusing to start"
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        worker = %self.config.worker_name,
                        error = %e,
                        "Session rebuild failed, backing off"
                    );
                    self.begin_rebuild().await;
                    continue;
                }
            };

            first_session = false;
            self.status.mark_ready();
            self.status.mark_healthy();
            info!(worker = %self.config.worker_name, queue = %self.topology.queue, "Consume session established");

            match self.serve(&channel, consumer, &shutdown).await {
                Ok(()) => break,
                Err(e) if e.is_transient() => {
                    warn!(
                        worker = %self.config.worker_name,
                        error = %e,
                        "Broker session lost, rebuilding"
                    );
                    self.begin_rebuild().await;
                }
                Err(e) => {
                    error!(worker = %self.config.worker_name, error = %e, "Unrecoverable worker error");
                    return Err(e);
                }
            }
        }

        info!(worker = %self.config.worker_name, "Worker stopped");
        Ok(())
    }

    async fn build_session(&self) -> Result<(Channel, QueueConsumer), WorkerError> {
        let channel = self.provider.acquire().await?;
        self.topology.ensure(&channel).await?;
        let consumer = QueueConsumer::subscribe(
            &channel,
            self.topology.queue.as_str(),
            &self.config.consumer_tag(),
        )
        .await?;
        Ok((channel, consumer))
    }

    async fn begin_rebuild(&self) {
        self.status.mark_degraded();
        self.status.record_rebuild();
        self.metrics.session_rebuilt();
        self.provider.invalidate().await;
        tokio::time::sleep(self.config.rebuild_backoff).await;
    }

    /// One consume session: poll with a bounded wait, probe the broker
    /// when idle long enough, and feed deliveries through the ladder.
    async fn serve(
        &self,
        channel: &Channel,
        mut consumer: QueueConsumer,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<(), WorkerError> {
        let mut last_probe = Instant::now();

        loop {
            if *shutdown.borrow() {
                info!(worker = %self.config.worker_name, "Received shutdown signal, stopping worker");
                return Ok(());
            }

            if last_probe.elapsed() >= self.config.probe_interval {
                self.probe(channel).await?;
                last_probe = Instant::now();
            }

            match consumer.next_delivery(self.config.poll_timeout).await? {
                None => continue,
                Some(delivery) => self.process_delivery(channel, delivery).await?,
            }
        }
    }

    /// Round-trip the broker by passively re-declaring the primary
    /// queue. Doubles as a queue-depth sample.
    async fn probe(&self, channel: &Channel) -> Result<(), WorkerError> {
        let queue = channel
            .queue_declare(
                self.topology.queue.as_str(),
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        self.metrics
            .queue_depth(self.topology.queue.as_str(), queue.message_count());
        self.status.record_probe();
        debug!(
            worker = %self.config.worker_name,
            queue = %self.topology.queue,
            depth = queue.message_count(),
            "Broker probe ok"
        );
        Ok(())
    }

    /// Decode, gate on the circuit breaker, invoke the handler, and
    /// settle the delivery.
    ///
    /// Only broker failures (ack/nack/publish) propagate out of here;
    /// they mean the session is gone and the unsettled message will be
    /// redelivered after the rebuild.
    async fn process_delivery(
        &self,
        channel: &Channel,
        delivery: Delivery,
    ) -> Result<(), WorkerError> {
        let task = self.handler.name();

        let payload: H::Payload = match serde_json::from_slice(&delivery.data) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(task = %task, error = %e, "Undecodable payload, dropping message");
                delivery.acker.ack(BasicAckOptions::default()).await?;
                self.metrics.task_payload_error();
                return Ok(());
            }
        };

        let resource = self.handler.resource_key(&payload);
        if let Some(key) = resource.as_deref() {
            if self.breaker.should_short_circuit(key) {
                warn!(
                    task = %task,
                    resource = %key,
                    last_error = ?self.breaker.last_error(key),
                    "Circuit open for resource, dead-lettering on arrival"
                );
                self.policy
                    .dead_letter(&delivery, task, DeadLetterReason::CircuitOpen)
                    .await?;
                self.metrics.circuit_short_circuit();
                self.metrics
                    .task_dead_lettered(DeadLetterReason::CircuitOpen.as_str());
                return Ok(());
            }
        }

        let started = Instant::now();
        let result = match AssertUnwindSafe(self.handler.handle(payload))
            .catch_unwind()
            .await
        {
            Ok(result) => result,
            Err(panic) => Err(TaskError::downstream(format!(
                "handler panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };

        match result {
            Ok(TaskOutcome::Completed) => {
                if let Some(key) = resource.as_deref() {
                    self.breaker.record_success(key);
                }
                delivery.acker.ack(BasicAckOptions::default()).await?;
                self.metrics.task_completed(started.elapsed());
                info!(
                    task = %task,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Task completed"
                );
            }
            Ok(TaskOutcome::Skipped { reason }) => {
                delivery.acker.ack(BasicAckOptions::default()).await?;
                self.metrics.task_skipped();
                info!(task = %task, reason = %reason, "Task skipped");
            }
            Err(e) if e.is_permanent() => {
                warn!(task = %task, error = %e, "Handler rejected payload, dropping message");
                delivery.acker.ack(BasicAckOptions::default()).await?;
                self.metrics.task_payload_error();
            }
            Err(e) => {
                let breaker_key = e
                    .resource()
                    .map(str::to_string)
                    .or(resource);
                if let Some(key) = breaker_key.as_deref() {
                    self.breaker.record_failure(key, &e.to_string());
                }

                let disposition = self
                    .policy
                    .handle_failure(channel, &delivery, task, &e.to_string())
                    .await?;
                match disposition {
                    Disposition::Retried { .. } => self.metrics.task_retried(),
                    Disposition::DeadLettered { reason } => {
                        self.metrics.task_dead_lettered(reason.as_str())
                    }
                }
            }
        }

        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
