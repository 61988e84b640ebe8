//! Dead-letter queue inspection and redrive.

use crate::connection::ChannelProvider;
use crate::error::WorkerError;
use crate::message::retry_properties;
use crate::topology::QueueTopology;
use lapin::options::{BasicAckOptions, BasicGetOptions, BasicPublishOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Snapshot of the dead-letter queue, as reported by the broker.
#[derive(Debug, Clone, Serialize)]
pub struct DlqStats {
    pub queue: String,
    pub depth: u32,
    pub consumers: u32,
}

/// Result of a redrive batch.
#[derive(Debug, Clone, Serialize)]
pub struct RedriveReport {
    pub requested: usize,
    pub redriven: usize,
}

/// Operator-facing access to a worker's dead-letter queue.
///
/// Redrive moves messages back onto the primary exchange with their
/// retry counter reset to zero, so a redriven task gets a full retry
/// budget again.
#[derive(Clone)]
pub struct DlqManager {
    provider: Arc<ChannelProvider>,
    topology: QueueTopology,
}

impl DlqManager {
    pub fn new(provider: Arc<ChannelProvider>, topology: QueueTopology) -> Self {
        Self { provider, topology }
    }

    /// Current depth and consumer count of the dead-letter queue.
    pub async fn stats(&self) -> Result<DlqStats, WorkerError> {
        let channel = self.provider.acquire().await?;
        let queue = channel
            .queue_declare(
                self.topology.dlx_queue.as_str(),
                QueueDeclareOptions {
                    passive: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;

        Ok(DlqStats {
            queue: self.topology.dlx_queue.clone(),
            depth: queue.message_count(),
            consumers: queue.consumer_count(),
        })
    }

    /// Move up to `count` messages from the dead-letter queue back onto
    /// the primary exchange. Stops early when the queue runs dry.
    pub async fn redrive(&self, count: usize) -> Result<RedriveReport, WorkerError> {
        let channel = self.provider.acquire().await?;
        let mut redriven = 0;

        for _ in 0..count {
            let Some(message) = channel
                .basic_get(
                    self.topology.dlx_queue.as_str(),
                    BasicGetOptions { no_ack: false },
                )
                .await?
            else {
                break;
            };

            let properties =
                retry_properties(message.delivery.properties.headers().as_ref(), 0);

            channel
                .basic_publish(
                    self.topology.exchange.as_str(),
                    self.topology.routing_key.as_str(),
                    BasicPublishOptions::default(),
                    &message.delivery.data,
                    properties,
                )
                .await?
                .await?;
            message.delivery.acker.ack(BasicAckOptions::default()).await?;

            redriven += 1;
        }

        info!(
            queue = %self.topology.dlx_queue,
            requested = count,
            redriven,
            "DLQ redrive finished"
        );

        Ok(RedriveReport {
            requested: count,
            redriven,
        })
    }
}
