//! AMQP Worker Framework
//!
//! A generic RabbitMQ worker framework for processing background tasks.
//!
//! ## Features
//!
//! - **Generic worker**: `AmqpWorker<H>` drives any [`TaskHandler`]
//! - **Bounded retries**: explicit `x-retry-count` republishes, then DLQ
//! - **Dead-letter topology**: DLX/DLQ declared alongside every queue
//! - **Resource circuit breaker**: dead-letter on arrival when a
//!   downstream endpoint keeps failing
//! - **Self-healing**: lost broker sessions degrade health and rebuild
//! - **Prometheus metrics**: built-in observability
//! - **Health endpoints**: K8s-ready liveness and readiness probes
//!
//! ## Example
//!
//! ```ignore
//! use amqp_worker::{AmqpWorker, TaskHandler, TaskOutcome, QueueTopology, WorkerConfig};
//!
//! struct MyHandler { /* collaborators */ }
//!
//! #[async_trait]
//! impl TaskHandler for MyHandler {
//!     type Payload = MyPayload;
//!
//!     fn name(&self) -> &str { "my_task" }
//!
//!     async fn handle(&self, payload: MyPayload) -> Result<TaskOutcome, TaskError> {
//!         /* validate, check idempotency, call downstream, persist */
//!         Ok(TaskOutcome::Completed)
//!     }
//! }
//!
//! let topology = QueueTopology::for_domain("my_domain");
//! let worker = AmqpWorker::new(handler, provider, topology, WorkerConfig::new("my_task"));
//! worker.run(shutdown_rx).await?;
//! ```

mod breaker;
mod config;
mod connection;
mod consumer;
mod dlq;
mod error;
mod handler;
pub mod message;
pub mod metrics;
mod publisher;
mod retry;
mod topology;
mod worker;

pub mod health;

// Re-export main types
pub use breaker::{BreakerConfig, ResourceCircuitBreaker};
pub use config::WorkerConfig;
pub use connection::ChannelProvider;
pub use consumer::QueueConsumer;
pub use dlq::{DlqManager, DlqStats, RedriveReport};
pub use error::{TaskError, WorkerError};
pub use handler::{TaskHandler, TaskOutcome};
pub use health::{admin_router, AdminState, HealthState, WorkerStatus};
pub use metrics::{init_metrics, WorkerMetrics};
pub use publisher::TaskPublisher;
pub use retry::{DeadLetterReason, Disposition, RetryPolicy};
pub use topology::QueueTopology;
pub use worker::AmqpWorker;
