//! Bounded-wait queue consumption.

use crate::error::WorkerError;
use futures::StreamExt;
use lapin::message::Delivery;
use lapin::options::BasicConsumeOptions;
use lapin::types::FieldTable;
use lapin::{Channel, Consumer};
use std::time::Duration;
use tracing::debug;

/// A subscribed consumer that yields deliveries with a bounded wait.
///
/// The worker loop polls rather than parking on the stream forever: an
/// idle tick returns `Ok(None)` so the caller regains control to run
/// health probes and check for shutdown between messages.
pub struct QueueConsumer {
    queue: String,
    consumer: Consumer,
}

impl QueueConsumer {
    /// Subscribe to a queue with the given consumer tag.
    pub async fn subscribe(
        channel: &Channel,
        queue: &str,
        consumer_tag: &str,
    ) -> Result<Self, WorkerError> {
        let consumer = channel
            .basic_consume(
                queue,
                consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        debug!(queue = %queue, consumer_tag = %consumer_tag, "Consumer subscribed");

        Ok(Self {
            queue: queue.to_string(),
            consumer,
        })
    }

    /// Wait up to `timeout` for the next delivery.
    ///
    /// `Ok(None)` means the queue was idle for the whole interval. A
    /// closed stream surfaces as [`WorkerError::ConsumerClosed`] so the
    /// session can be rebuilt.
    pub async fn next_delivery(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<Delivery>, WorkerError> {
        match tokio::time::timeout(timeout, self.consumer.next()).await {
            Err(_) => Ok(None),
            Ok(None) => Err(WorkerError::ConsumerClosed {
                queue: self.queue.clone(),
            }),
            Ok(Some(Ok(delivery))) => Ok(Some(delivery)),
            Ok(Some(Err(e))) => Err(WorkerError::Broker(e)),
        }
    }

    pub fn queue(&self) -> &str {
        &self.queue
    }
}
