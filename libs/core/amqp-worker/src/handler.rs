//! The contract a domain task implements to run inside the worker.

use crate::error::TaskError;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// What a handler reports for a message it accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The side effect ran and its result was persisted.
    Completed,
    /// The message was valid but there was nothing to do (already
    /// processed, entity gone, or in a terminal state). Acked without
    /// being counted as work.
    Skipped { reason: String },
}

impl TaskOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// A unit of domain work driven by queue messages.
///
/// Implementations own the full task lifecycle: validate the referenced
/// entity, check idempotency, call the external service, persist the
/// result. The worker owns everything around that - decode, ack/nack,
/// retries, dead-lettering, and the per-resource circuit breaker.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    /// Message payload this handler consumes.
    type Payload: DeserializeOwned + Send;

    /// Stable name used in logs and metric labels.
    fn name(&self) -> &str;

    /// External resource identity for circuit breaking, if the task
    /// targets one (a peer URL, an SMTP relay). `None` opts the message
    /// out of short-circuiting.
    fn resource_key(&self, payload: &Self::Payload) -> Option<String> {
        let _ = payload;
        None
    }

    /// Process one message.
    async fn handle(&self, payload: Self::Payload) -> Result<TaskOutcome, TaskError>;
}
