//! Per-resource circuit breaker.
//!
//! Failure counts are keyed by an external resource identity (a peer
//! URL, an SMTP relay, an AI endpoint). Once a resource crosses the
//! threshold inside the rolling window, messages referencing it are
//! dead-lettered on arrival - retrying against an endpoint that is down
//! for everyone only starves the queue.
//!
//! The table is process-local, bounded, and injected into the worker
//! rather than living as ambient state: replicas of the same worker keep
//! independent counts, which is accepted for single-process deployments.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Circuit breaker tuning.
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures within the window before the circuit opens.
    pub threshold: u32,
    /// Rolling window anchored at a key's first recorded failure.
    pub window: Duration,
    /// Upper bound on tracked resources. A full table drops expired
    /// records first and evicts the stalest live one only after that.
    pub max_entries: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            threshold: 3,
            window: Duration::from_secs(60 * 60),
            max_entries: 1024,
        }
    }
}

impl BreakerConfig {
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold.max(1);
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }
}

#[derive(Debug, Clone)]
struct FailureRecord {
    count: u32,
    first_failure_at: Instant,
    last_failure_at: Instant,
    last_error: String,
}

/// Failure-count gate keyed by external resource identity.
pub struct ResourceCircuitBreaker {
    config: BreakerConfig,
    records: RwLock<HashMap<u64, FailureRecord>>,
}

fn key_hash(key: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

impl ResourceCircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Record a failed call against a resource.
    ///
    /// A record whose window has lapsed is restarted rather than
    /// incremented, so stale history cannot open the circuit.
    pub fn record_failure(&self, key: &str, error: &str) {
        let now = Instant::now();
        let hash = key_hash(key);
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());

        match records.get_mut(&hash) {
            Some(record) if now.duration_since(record.first_failure_at) <= self.config.window => {
                record.count += 1;
                record.last_failure_at = now;
                record.last_error = error.to_string();

                if record.count == self.config.threshold {
                    warn!(
                        resource = %key,
                        failures = record.count,
                        "Resource circuit OPENED"
                    );
                } else {
                    debug!(resource = %key, failures = record.count, "Resource failure recorded");
                }
            }
            _ => {
                if records.len() >= self.config.max_entries && !records.contains_key(&hash) {
                    // Expired history goes first; a live record is only
                    // evicted when the table is full of current ones.
                    records.retain(|_, record| {
                        now.duration_since(record.first_failure_at) <= self.config.window
                    });
                }
                if records.len() >= self.config.max_entries && !records.contains_key(&hash) {
                    evict_stalest(&mut records);
                }
                records.insert(
                    hash,
                    FailureRecord {
                        count: 1,
                        first_failure_at: now,
                        last_failure_at: now,
                        last_error: error.to_string(),
                    },
                );
                debug!(resource = %key, failures = 1, "Resource failure recorded");
            }
        }
    }

    /// Record a successful call: the resource's failure history is cleared.
    pub fn record_success(&self, key: &str) {
        let hash = key_hash(key);
        let mut records = self.records.write().unwrap_or_else(|e| e.into_inner());
        if records.remove(&hash).is_some() {
            info!(resource = %key, "Resource circuit reset after success");
        }
    }

    /// Whether messages for this resource should skip processing and go
    /// straight to the dead-letter queue.
    pub fn should_short_circuit(&self, key: &str) -> bool {
        let hash = key_hash(key);
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        match records.get(&hash) {
            Some(record) => {
                let in_window =
                    record.first_failure_at.elapsed() <= self.config.window;
                in_window && record.count >= self.config.threshold
            }
            None => false,
        }
    }

    /// Current failure count inside the window, if any.
    pub fn failure_count(&self, key: &str) -> Option<u32> {
        let hash = key_hash(key);
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&hash).and_then(|record| {
            if record.first_failure_at.elapsed() <= self.config.window {
                Some(record.count)
            } else {
                None
            }
        })
    }

    /// Last error recorded for a resource, for operator-facing logs.
    pub fn last_error(&self, key: &str) -> Option<String> {
        let hash = key_hash(key);
        let records = self.records.read().unwrap_or_else(|e| e.into_inner());
        records.get(&hash).map(|record| record.last_error.clone())
    }

    /// Number of resources currently tracked.
    pub fn tracked_resources(&self) -> usize {
        self.records.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn evict_stalest(records: &mut HashMap<u64, FailureRecord>) {
    if let Some(stalest) = records
        .iter()
        .min_by_key(|(_, record)| record.last_failure_at)
        .map(|(hash, _)| *hash)
    {
        records.remove(&stalest);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, window: Duration) -> ResourceCircuitBreaker {
        ResourceCircuitBreaker::new(
            BreakerConfig::default()
                .with_threshold(threshold)
                .with_window(window),
        )
    }

    #[test]
    fn test_opens_at_threshold() {
        let breaker = breaker(3, Duration::from_secs(3600));
        let url = "https://dead.example";

        breaker.record_failure(url, "connect timeout");
        breaker.record_failure(url, "connect timeout");
        assert!(!breaker.should_short_circuit(url));

        breaker.record_failure(url, "connect timeout");
        assert!(breaker.should_short_circuit(url));
        assert_eq!(breaker.failure_count(url), Some(3));
    }

    #[test]
    fn test_success_clears_record() {
        let breaker = breaker(3, Duration::from_secs(3600));
        let url = "https://flaky.example";

        breaker.record_failure(url, "503");
        breaker.record_failure(url, "503");
        breaker.record_failure(url, "503");
        assert!(breaker.should_short_circuit(url));

        breaker.record_success(url);
        assert!(!breaker.should_short_circuit(url));
        assert_eq!(breaker.failure_count(url), None);
    }

    #[test]
    fn test_keys_are_independent() {
        let breaker = breaker(3, Duration::from_secs(3600));

        breaker.record_failure("https://a.example", "timeout");
        breaker.record_failure("https://a.example", "timeout");
        breaker.record_failure("https://a.example", "timeout");

        assert!(breaker.should_short_circuit("https://a.example"));
        assert!(!breaker.should_short_circuit("https://b.example"));
    }

    #[test]
    fn test_window_expiry_closes_circuit() {
        let breaker = breaker(2, Duration::from_millis(40));
        let url = "https://slow.example";

        breaker.record_failure(url, "timeout");
        breaker.record_failure(url, "timeout");
        assert!(breaker.should_short_circuit(url));

        std::thread::sleep(Duration::from_millis(60));
        assert!(!breaker.should_short_circuit(url));
        assert_eq!(breaker.failure_count(url), None);
    }

    #[test]
    fn test_expired_record_restarts_count() {
        let breaker = breaker(3, Duration::from_millis(40));
        let url = "https://recovering.example";

        breaker.record_failure(url, "timeout");
        breaker.record_failure(url, "timeout");
        std::thread::sleep(Duration::from_millis(60));

        // The old window lapsed: this failure starts a fresh record.
        breaker.record_failure(url, "timeout");
        assert_eq!(breaker.failure_count(url), Some(1));
        assert!(!breaker.should_short_circuit(url));
    }

    #[test]
    fn test_unknown_key_is_closed() {
        let breaker = breaker(3, Duration::from_secs(3600));
        assert!(!breaker.should_short_circuit("https://never-seen.example"));
        assert_eq!(breaker.failure_count("https://never-seen.example"), None);
    }

    #[test]
    fn test_bounded_table_evicts_stalest() {
        let breaker = ResourceCircuitBreaker::new(
            BreakerConfig::default()
                .with_threshold(3)
                .with_max_entries(2),
        );

        breaker.record_failure("https://one.example", "timeout");
        std::thread::sleep(Duration::from_millis(5));
        breaker.record_failure("https://two.example", "timeout");
        std::thread::sleep(Duration::from_millis(5));
        breaker.record_failure("https://three.example", "timeout");

        assert_eq!(breaker.tracked_resources(), 2);
        // The stalest record (one.example) was evicted.
        assert_eq!(breaker.failure_count("https://one.example"), None);
        assert_eq!(breaker.failure_count("https://three.example"), Some(1));
    }

    #[test]
    fn test_full_table_prunes_expired_before_evicting() {
        let breaker = ResourceCircuitBreaker::new(
            BreakerConfig::default()
                .with_threshold(3)
                .with_window(Duration::from_millis(40))
                .with_max_entries(2),
        );

        breaker.record_failure("https://old-a.example", "timeout");
        breaker.record_failure("https://old-b.example", "timeout");
        std::thread::sleep(Duration::from_millis(60));

        // Both resident records lapsed; the new key replaces them
        // instead of evicting anything still live.
        breaker.record_failure("https://fresh.example", "timeout");
        assert_eq!(breaker.tracked_resources(), 1);
        assert_eq!(breaker.failure_count("https://fresh.example"), Some(1));
    }

    #[test]
    fn test_last_error_is_kept() {
        let breaker = breaker(3, Duration::from_secs(3600));
        breaker.record_failure("https://a.example", "connect timeout");
        breaker.record_failure("https://a.example", "HTTP 502");
        assert_eq!(
            breaker.last_error("https://a.example"),
            Some("HTTP 502".to_string())
        );
    }
}
