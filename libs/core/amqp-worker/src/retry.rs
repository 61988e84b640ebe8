//! Retry and dead-letter disposition for failed deliveries.

use crate::error::WorkerError;
use crate::message::{retry_count, retry_properties};
use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicNackOptions, BasicPublishOptions};
use lapin::Channel;
use tracing::{error, warn};

/// Where a failed delivery ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Republished with an incremented retry counter; `attempt` is the
    /// new `x-retry-count` value.
    Retried { attempt: u32 },
    /// Removed from the primary queue for good.
    DeadLettered { reason: DeadLetterReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeadLetterReason {
    /// Retry budget spent.
    Exhausted,
    /// `x-retry-count` was unreadable; retrying a message we cannot
    /// count would loop forever.
    CorruptHeader,
    /// The circuit breaker is open for this message's target resource.
    CircuitOpen,
}

impl DeadLetterReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::CorruptHeader => "corrupt_header",
            Self::CircuitOpen => "circuit_open",
        }
    }
}

/// Applies the bounded-retry contract to failed deliveries.
///
/// A retry is an explicit republish of the same body to the original
/// exchange and routing key with `x-retry-count` incremented, followed
/// by an ack of the original delivery. The counter therefore stays
/// inspectable on the wire instead of hiding in broker requeue state.
/// An exhausted message is rejected without requeue and travels to the
/// dead-letter queue over the topology's DLX binding.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self { max_retries }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Decide and execute the fate of a failed delivery.
    pub async fn handle_failure(
        &self,
        channel: &Channel,
        delivery: &Delivery,
        task: &str,
        error: &str,
    ) -> Result<Disposition, WorkerError> {
        let count = match retry_count(delivery.properties.headers().as_ref()) {
            Ok(count) => count,
            Err(_) => {
                error!(
                    task = %task,
                    "Unreadable x-retry-count header, dead-lettering to avoid a redelivery loop"
                );
                return self.dead_letter(delivery, task, DeadLetterReason::CorruptHeader).await;
            }
        };

        if count >= self.max_retries {
            error!(
                task = %task,
                retry_count = count,
                max_retries = self.max_retries,
                error = %error,
                "Retries exhausted, dead-lettering"
            );
            return self.dead_letter(delivery, task, DeadLetterReason::Exhausted).await;
        }

        let attempt = count + 1;
        let properties = retry_properties(delivery.properties.headers().as_ref(), attempt);

        // Publish the envelope before acking the original: if the
        // republish fails the unacked message is redelivered, so the
        // task is never lost between the two steps.
        channel
            .basic_publish(
                delivery.exchange.as_str(),
                delivery.routing_key.as_str(),
                BasicPublishOptions::default(),
                &delivery.data,
                properties,
            )
            .await?
            .await?;
        delivery.acker.ack(BasicAckOptions::default()).await?;

        warn!(
            task = %task,
            retry_count = attempt,
            max_retries = self.max_retries,
            error = %error,
            "Task failed, retry republished"
        );

        Ok(Disposition::Retried { attempt })
    }

    /// Reject without requeue so the queue's DLX binding routes the
    /// message to the dead-letter queue.
    pub async fn dead_letter(
        &self,
        delivery: &Delivery,
        task: &str,
        reason: DeadLetterReason,
    ) -> Result<Disposition, WorkerError> {
        delivery
            .acker
            .nack(BasicNackOptions {
                multiple: false,
                requeue: false,
            })
            .await?;

        warn!(task = %task, reason = reason.as_str(), "Message dead-lettered");

        Ok(Disposition::DeadLettered { reason })
    }
}
