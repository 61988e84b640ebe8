//! Queue topology declaration.
//!
//! Each worker owns a private exchange/queue pair plus a dead-letter
//! exchange/queue pair. `ensure` is idempotent and runs once at startup
//! and again after every channel rebuild.

use crate::error::WorkerError;
use lapin::options::{ExchangeDeclareOptions, QueueBindOptions, QueueDeclareOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{Channel, ExchangeKind};
use tracing::{debug, info};

/// The exchange/queue names a worker consumes from.
///
/// Immutable for the process lifetime. Defaults follow the
/// `<domain>_exchange` / `<domain>_queue` / `<domain>_dlx_*` convention;
/// every name can be overridden from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueTopology {
    pub exchange: String,
    pub routing_key: String,
    pub queue: String,
    pub dlx_exchange: String,
    pub dlx_queue: String,
}

impl QueueTopology {
    /// Default names for a worker domain (e.g. "mail", "link_audit").
    pub fn for_domain(domain: &str) -> Self {
        Self {
            exchange: format!("{domain}_exchange"),
            routing_key: domain.to_string(),
            queue: format!("{domain}_queue"),
            dlx_exchange: format!("{domain}_dlx_exchange"),
            dlx_queue: format!("{domain}_dlx_queue"),
        }
    }

    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = exchange.into();
        self
    }

    pub fn with_routing_key(mut self, routing_key: impl Into<String>) -> Self {
        self.routing_key = routing_key.into();
        self
    }

    pub fn with_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn with_dlx(
        mut self,
        dlx_exchange: impl Into<String>,
        dlx_queue: impl Into<String>,
    ) -> Self {
        self.dlx_exchange = dlx_exchange.into();
        self.dlx_queue = dlx_queue.into();
        self
    }

    /// Declare the full topology on a channel.
    ///
    /// Order matters: the dead-letter pair must exist before the primary
    /// queue references it in its arguments. All declares are durable and
    /// idempotent; a failure here is fatal to worker startup.
    pub async fn ensure(&self, channel: &Channel) -> Result<(), WorkerError> {
        let durable = ExchangeDeclareOptions {
            durable: true,
            ..Default::default()
        };
        let durable_queue = QueueDeclareOptions {
            durable: true,
            ..Default::default()
        };

        // Dead-letter exchange and queue first.
        channel
            .exchange_declare(
                self.dlx_exchange.as_str(),
                ExchangeKind::Direct,
                durable,
                FieldTable::default(),
            )
            .await
            .map_err(|source| WorkerError::Topology {
                name: self.dlx_exchange.clone(),
                source,
            })?;

        channel
            .queue_declare(
                self.dlx_queue.as_str(),
                durable_queue,
                FieldTable::default(),
            )
            .await
            .map_err(|source| WorkerError::Topology {
                name: self.dlx_queue.clone(),
                source,
            })?;

        channel
            .queue_bind(
                self.dlx_queue.as_str(),
                self.dlx_exchange.as_str(),
                self.routing_key.as_str(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| WorkerError::Topology {
                name: self.dlx_queue.clone(),
                source,
            })?;

        debug!(
            dlx_exchange = %self.dlx_exchange,
            dlx_queue = %self.dlx_queue,
            "Dead-letter topology declared"
        );

        // Primary exchange and queue, with dead-letter arguments pointing
        // at the DLX so rejected messages route there automatically.
        channel
            .exchange_declare(
                self.exchange.as_str(),
                ExchangeKind::Direct,
                durable,
                FieldTable::default(),
            )
            .await
            .map_err(|source| WorkerError::Topology {
                name: self.exchange.clone(),
                source,
            })?;

        let mut queue_args = FieldTable::default();
        queue_args.insert(
            "x-dead-letter-exchange".into(),
            AMQPValue::LongString(self.dlx_exchange.as_str().into()),
        );
        queue_args.insert(
            "x-dead-letter-routing-key".into(),
            AMQPValue::LongString(self.routing_key.as_str().into()),
        );

        channel
            .queue_declare(self.queue.as_str(), durable_queue, queue_args)
            .await
            .map_err(|source| WorkerError::Topology {
                name: self.queue.clone(),
                source,
            })?;

        channel
            .queue_bind(
                self.queue.as_str(),
                self.exchange.as_str(),
                self.routing_key.as_str(),
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|source| WorkerError::Topology {
                name: self.queue.clone(),
                source,
            })?;

        info!(
            exchange = %self.exchange,
            queue = %self.queue,
            routing_key = %self.routing_key,
            dlx_exchange = %self.dlx_exchange,
            "Queue topology declared"
        );

        Ok(())
    }
}
