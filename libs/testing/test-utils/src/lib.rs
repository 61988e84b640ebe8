//! Shared test utilities for engine and domain testing
//!
//! This crate provides reusable test infrastructure for all worker crates:
//! - `TestRabbitMq`: RabbitMQ container with automatic cleanup (feature: "rabbitmq")
//! - `TestDataBuilder`: Deterministic test data generation (always available)
//! - `assertions`: Custom assertion helpers (always available)
//!
//! # Features
//!
//! - `rabbitmq` (default): Enables RabbitMQ test infrastructure
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::{TestRabbitMq, TestDataBuilder};
//!
//! #[tokio::test]
//! async fn my_broker_test() {
//!     let broker = TestRabbitMq::new().await;
//!     let builder = TestDataBuilder::from_test_name("my_broker_test");
//!
//!     // Isolated queue names per test keep runs independent
//!     let domain = builder.queue_domain("moderation");
//! }
//! ```

// Conditionally compile broker module based on features
#[cfg(feature = "rabbitmq")]
mod rabbitmq;

// Re-export based on enabled features
#[cfg(feature = "rabbitmq")]
pub use rabbitmq::TestRabbitMq;

/// Builder for test data with deterministic randomization
///
/// This ensures tests are reproducible by using seeded random data.
pub struct TestDataBuilder {
    seed: u64,
}

impl TestDataBuilder {
    /// Create a new builder with a seed (for deterministic tests)
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Create from test name (generates seed from test name hash)
    ///
    /// This is the recommended way to create a builder for consistent test data.
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("test_retry_exhaustion");
    /// ```
    pub fn from_test_name(name: &str) -> Self {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        name.hash(&mut hasher);
        Self::new(hasher.finish())
    }

    /// Generate a deterministic entity id (comment, post, link) for testing
    pub fn entity_id(&self) -> i64 {
        (self.seed % (i64::MAX as u64)) as i64
    }

    /// Generate a unique name for testing
    ///
    /// # Arguments
    ///
    /// * `prefix` - The type of thing (e.g., "comment", "queue")
    /// * `suffix` - A unique identifier within the test (e.g., "main", "dlq")
    ///
    /// # Example
    ///
    /// ```
    /// use test_utils::TestDataBuilder;
    ///
    /// let builder = TestDataBuilder::from_test_name("my_test");
    /// let name = builder.name("comment", "main");
    /// // Returns: "test-comment-12345-main"
    /// ```
    pub fn name(&self, prefix: &str, suffix: &str) -> String {
        format!("test-{}-{}-{}", prefix, self.seed, suffix)
    }

    /// Generate a per-test domain for queue topology naming
    ///
    /// Using a distinct domain per test keeps exchanges and queues from
    /// colliding when several tests share one broker container.
    pub fn queue_domain(&self, prefix: &str) -> String {
        format!("test_{}_{}", prefix, self.seed)
    }

    /// Generate a deterministic URL for circuit breaker and link tests
    pub fn url(&self, host: &str) -> String {
        format!("https://{}-{}.example", host, self.seed)
    }
}

/// Test assertion helpers
pub mod assertions {
    /// Assert that an optional value is Some
    pub fn assert_some<T>(value: Option<T>, context: &str) -> T {
        value.unwrap_or_else(|| panic!("{}: expected Some, got None", context))
    }

    /// Assert that a string contains a substring with a nice error message
    pub fn assert_contains(haystack: &str, needle: &str, context: &str) {
        assert!(
            haystack.contains(needle),
            "{}: expected {:?} to contain {:?}",
            context,
            haystack,
            needle
        );
    }
}
