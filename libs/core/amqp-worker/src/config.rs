//! Worker tuning knobs.

use std::time::Duration;
use uuid::Uuid;

/// Runtime settings for one worker process.
///
/// Defaults match the production fleet: strict single-in-flight
/// processing, three total attempts per message, a one-second bounded
/// poll so shutdown and probes stay responsive, and a short backoff
/// between session rebuilds.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Stable worker name used in logs, metric labels, and consumer tags.
    pub worker_name: String,
    /// Unacked deliveries the broker may hand us at once.
    pub prefetch: u16,
    /// Redeliveries after the first attempt before dead-lettering.
    pub max_retries: u32,
    /// Longest a single poll waits for a delivery before yielding.
    pub poll_timeout: Duration,
    /// How often the health probe round-trips the broker when idle.
    pub probe_interval: Duration,
    /// Pause between a failed session and the rebuild attempt.
    pub rebuild_backoff: Duration,
}

impl WorkerConfig {
    pub fn new(worker_name: impl Into<String>) -> Self {
        Self {
            worker_name: worker_name.into(),
            prefetch: 1,
            max_retries: 2,
            poll_timeout: Duration::from_millis(1000),
            probe_interval: Duration::from_secs(60),
            rebuild_backoff: Duration::from_millis(500),
        }
    }

    pub fn with_prefetch(mut self, prefetch: u16) -> Self {
        self.prefetch = prefetch;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    pub fn with_probe_interval(mut self, probe_interval: Duration) -> Self {
        self.probe_interval = probe_interval;
        self
    }

    pub fn with_rebuild_backoff(mut self, rebuild_backoff: Duration) -> Self {
        self.rebuild_backoff = rebuild_backoff;
        self
    }

    /// Fresh consumer tag for a subscription. A new tag per session
    /// keeps rebuilt consumers distinguishable in the management UI.
    pub fn consumer_tag(&self) -> String {
        format!("{}_consumer_{}", self.worker_name, Uuid::new_v4().simple())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = WorkerConfig::new("moderation");
        assert_eq!(config.worker_name, "moderation");
        assert_eq!(config.prefetch, 1);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.poll_timeout, Duration::from_millis(1000));
        assert_eq!(config.probe_interval, Duration::from_secs(60));
        assert_eq!(config.rebuild_backoff, Duration::from_millis(500));
    }

    #[test]
    fn test_builder_overrides() {
        let config = WorkerConfig::new("mail")
            .with_prefetch(5)
            .with_max_retries(4)
            .with_poll_timeout(Duration::from_millis(250))
            .with_probe_interval(Duration::from_secs(10))
            .with_rebuild_backoff(Duration::from_millis(100));

        assert_eq!(config.prefetch, 5);
        assert_eq!(config.max_retries, 4);
        assert_eq!(config.poll_timeout, Duration::from_millis(250));
        assert_eq!(config.probe_interval, Duration::from_secs(10));
        assert_eq!(config.rebuild_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_consumer_tags_are_unique_per_session() {
        let config = WorkerConfig::new("callbacks");
        let first = config.consumer_tag();
        let second = config.consumer_tag();

        assert!(first.starts_with("callbacks_consumer_"));
        assert_ne!(first, second);
    }
}
