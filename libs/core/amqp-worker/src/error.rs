//! Worker error types and broker-error classification.
//!
//! Two layers of errors live here:
//! - `WorkerError`: broker/engine failures (connection loss, declare
//!   failures, serialization). Transient broker errors trigger a channel
//!   rebuild instead of failing the worker.
//! - `TaskError`: what a task handler reports for a single message.
//!   `Payload` is permanent (ack and drop), `Downstream` goes through the
//!   retry policy and feeds the per-resource circuit breaker.

use thiserror::Error;

/// Engine-level errors.
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Broker connection, channel, or protocol error.
    #[error("Broker error: {0}")]
    Broker(#[from] lapin::Error),

    /// Exchange/queue declaration failed. Fatal at worker startup.
    #[error("Topology declaration failed for '{name}': {source}")]
    Topology {
        name: String,
        #[source]
        source: lapin::Error,
    },

    /// Serialization/deserialization error on the publish path.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Consumer stream ended unexpectedly (channel torn down by the broker).
    #[error("Consumer stream for '{queue}' closed")]
    ConsumerClosed { queue: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl WorkerError {
    /// True when the error indicates a broken connection or channel and the
    /// supervisor should invalidate the provider and rebuild.
    ///
    /// Classification is on `lapin::Error` variants, never on message
    /// text: I/O failures, protocol errors (the broker closes the channel
    /// with them), and invalid channel/connection state all mean the
    /// current channel is unusable.
    pub fn is_transient(&self) -> bool {
        match self {
            WorkerError::Broker(e) => is_transient_broker_error(e),
            WorkerError::ConsumerClosed { .. } => true,
            WorkerError::Topology { source, .. } => is_transient_broker_error(source),
            WorkerError::Serialization(_) | WorkerError::Config(_) => false,
        }
    }
}

fn is_transient_broker_error(e: &lapin::Error) -> bool {
    matches!(
        e,
        lapin::Error::IOError(_)
            | lapin::Error::ProtocolError(_)
            | lapin::Error::InvalidChannelState(_)
            | lapin::Error::InvalidConnectionState(_)
    )
}

/// What a handler reports for a single task.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The message body is unusable: not valid JSON, missing required
    /// fields, or failing validation. Permanent - acked and dropped,
    /// never retried.
    #[error("Invalid payload: {message}")]
    Payload { message: String },

    /// An external call (HTTP, SMTP, AI provider) failed or timed out.
    /// Transient - handed to the retry policy. `resource` identifies the
    /// external endpoint for circuit-breaker bookkeeping.
    #[error("Downstream call failed: {message}")]
    Downstream {
        resource: Option<String>,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TaskError {
    /// Create a payload error.
    pub fn payload(message: impl Into<String>) -> Self {
        TaskError::Payload {
            message: message.into(),
        }
    }

    /// Create a downstream error with no resource key.
    pub fn downstream(message: impl Into<String>) -> Self {
        TaskError::Downstream {
            resource: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a downstream error attributed to an external resource.
    pub fn downstream_for(resource: impl Into<String>, message: impl Into<String>) -> Self {
        TaskError::Downstream {
            resource: Some(resource.into()),
            message: message.into(),
            source: None,
        }
    }

    /// Attach an underlying error as the source.
    pub fn with_source(mut self, err: impl std::error::Error + Send + Sync + 'static) -> Self {
        if let TaskError::Downstream { source, .. } = &mut self {
            *source = Some(Box::new(err));
        }
        self
    }

    /// The resource key for circuit-breaker bookkeeping, if any.
    pub fn resource(&self) -> Option<&str> {
        match self {
            TaskError::Downstream { resource, .. } => resource.as_deref(),
            TaskError::Payload { .. } => None,
        }
    }

    /// Permanent errors are acked and dropped without retry.
    pub fn is_permanent(&self) -> bool {
        matches!(self, TaskError::Payload { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_io_error_is_transient() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "broken pipe");
        let err = WorkerError::Broker(lapin::Error::IOError(Arc::new(io)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_invalid_channel_state_is_transient() {
        let err = WorkerError::Broker(lapin::Error::InvalidChannelState(
            lapin::ChannelState::Closed,
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn test_invalid_connection_state_is_transient() {
        let err = WorkerError::Broker(lapin::Error::InvalidConnectionState(
            lapin::ConnectionState::Closed,
        ));
        assert!(err.is_transient());
    }

    #[test]
    fn test_consumer_closed_is_transient() {
        let err = WorkerError::ConsumerClosed {
            queue: "mail_queue".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_serialization_is_not_transient() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = WorkerError::Serialization(json_err);
        assert!(!err.is_transient());
    }

    #[test]
    fn test_config_is_not_transient() {
        let err = WorkerError::Config("bad prefetch".to_string());
        assert!(!err.is_transient());
    }

    #[test]
    fn test_task_error_constructors() {
        let payload = TaskError::payload("missing comment_id");
        assert!(payload.is_permanent());
        assert!(payload.resource().is_none());

        let downstream = TaskError::downstream_for("https://peer.example/api", "timed out");
        assert!(!downstream.is_permanent());
        assert_eq!(downstream.resource(), Some("https://peer.example/api"));
    }

    #[test]
    fn test_task_error_with_source() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout");
        let err = TaskError::downstream("request failed").with_source(io);
        match err {
            TaskError::Downstream { source, .. } => assert!(source.is_some()),
            _ => panic!("expected downstream error"),
        }
    }
}
