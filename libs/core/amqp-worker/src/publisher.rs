//! Publishing tasks onto a worker's queue.

use crate::connection::ChannelProvider;
use crate::error::WorkerError;
use crate::message::json_properties;
use crate::topology::QueueTopology;
use chrono::Utc;
use lapin::options::BasicPublishOptions;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Publishes JSON task messages with publisher confirms.
///
/// Producers share the channel provider with the rest of the process;
/// every publish waits for the broker confirm so an enqueue that
/// returns `Ok` is actually on the queue.
#[derive(Clone)]
pub struct TaskPublisher {
    provider: Arc<ChannelProvider>,
}

impl TaskPublisher {
    pub fn new(provider: Arc<ChannelProvider>) -> Self {
        Self { provider }
    }

    /// Serialize `payload` and publish it to the topology's primary
    /// exchange. Returns the generated message id.
    pub async fn publish<T: Serialize>(
        &self,
        topology: &QueueTopology,
        payload: &T,
    ) -> Result<String, WorkerError> {
        let body = serde_json::to_vec(payload)?;
        let message_id = Uuid::new_v4().to_string();
        let properties = json_properties()
            .with_message_id(message_id.as_str().into())
            .with_timestamp(Utc::now().timestamp() as u64);

        let channel = self.provider.acquire().await?;
        channel
            .basic_publish(
                topology.exchange.as_str(),
                topology.routing_key.as_str(),
                BasicPublishOptions::default(),
                &body,
                properties,
            )
            .await?
            .await?;

        debug!(
            exchange = %topology.exchange,
            routing_key = %topology.routing_key,
            message_id = %message_id,
            "Task published"
        );

        Ok(message_id)
    }
}
