//! Broker connection/channel ownership.
//!
//! One connection and one channel per worker process. `acquire` connects
//! lazily and then hands out the cached channel; it never reconnects on
//! its own - deciding that a channel is dead and rebuilding it is the
//! supervisor's job, driven by the health probe.

use crate::error::WorkerError;
use lapin::options::{BasicQosOptions, ConfirmSelectOptions};
use lapin::{Channel, Connection, ConnectionProperties};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

struct CachedChannel {
    connection: Connection,
    channel: Channel,
}

/// Owns the process's broker connection and its single channel.
pub struct ChannelProvider {
    url: String,
    connection_name: String,
    prefetch: u16,
    cached: Mutex<Option<CachedChannel>>,
}

impl ChannelProvider {
    pub fn new(url: impl Into<String>, connection_name: impl Into<String>, prefetch: u16) -> Self {
        Self {
            url: url.into(),
            connection_name: connection_name.into(),
            prefetch,
            cached: Mutex::new(None),
        }
    }

    /// Get the process channel, connecting on first use.
    ///
    /// The channel comes with QoS prefetch applied (one unacked message
    /// in flight) and publisher confirms enabled. Returns the cached
    /// channel on subsequent calls until `invalidate` clears it.
    pub async fn acquire(&self) -> Result<Channel, WorkerError> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            return Ok(entry.channel.clone());
        }

        let connection = Connection::connect(
            &self.url,
            ConnectionProperties::default().with_connection_name(self.connection_name.as_str().into()),
        )
        .await?;

        let channel = connection.create_channel().await?;
        channel
            .basic_qos(self.prefetch, BasicQosOptions::default())
            .await?;
        channel
            .confirm_select(ConfirmSelectOptions::default())
            .await?;

        info!(
            connection_name = %self.connection_name,
            prefetch = %self.prefetch,
            "Broker connection established"
        );

        let handle = channel.clone();
        *cached = Some(CachedChannel {
            connection,
            channel,
        });
        Ok(handle)
    }

    /// Drop the cached connection/channel. The next `acquire` reconnects.
    ///
    /// Closing a broken connection can itself fail; that is expected and
    /// only logged.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.lock().await;
        if let Some(entry) = cached.take() {
            debug!("Invalidating broker channel");
            if let Err(e) = entry.connection.close(200, "rebuilding").await {
                warn!(error = %e, "Error closing broker connection during invalidate");
            }
        }
    }

    /// Whether the cached connection still reports itself connected.
    pub async fn is_connected(&self) -> bool {
        let cached = self.cached.lock().await;
        cached
            .as_ref()
            .map(|entry| entry.connection.status().connected())
            .unwrap_or(false)
    }
}
