//! Configuration for the ingestion pipeline.
//!
//! This module provides the [`Config`] struct for tuning batching, channel
//! capacity, and the flush retry policy, all injected into the ingestion
//! loop at construction time.

use std::time::Duration;

/// Retry policy for batch persistence
///
/// Governs how many times a failed batch insert is retried and how the
/// delay between attempts grows. Delays follow
/// `initial_delay * multiplier^attempt`, capped at `max_delay`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first failed attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
    /// Backoff multiplier applied per retry
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Calculate the delay before retrying after the given attempt
    ///
    /// `attempt` is zero-based: the delay after the first failure is
    /// `delay_for_attempt(0)`.
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64;
        let delay = base * self.multiplier.powi(attempt as i32);
        Duration::from_millis((delay as u64).min(self.max_delay.as_millis() as u64))
    }
}

/// Configuration for the ingestion pipeline
///
/// # Example
///
/// ```rust
/// use bookpipe::Config;
/// use std::time::Duration;
///
/// let config = Config::new()
///     .with_topic("orders")
///     .with_max_batch_size(10)
///     .with_flush_interval(Duration::from_secs(2));
///
/// assert_eq!(config.max_batch_size(), 10);
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Stream topic to consume
    topic: String,

    /// Flush once this many orders are pending
    max_batch_size: usize,

    /// Flush once the oldest pending order is this old
    flush_interval: Duration,

    /// Capacity of the decoded-event channel between pumps and the loop
    channel_capacity: usize,

    /// Retry policy for failed batch inserts
    retry: RetryPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            topic: "orders".to_string(),
            max_batch_size: 10,
            flush_interval: Duration::from_secs(2),
            channel_capacity: 256,
            retry: RetryPolicy::default(),
        }
    }
}

impl Config {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the stream topic to consume
    #[must_use]
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Set the size threshold that triggers a flush
    #[must_use]
    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
    }

    /// Set the age threshold that triggers a flush
    #[must_use]
    pub fn with_flush_interval(mut self, flush_interval: Duration) -> Self {
        self.flush_interval = flush_interval;
        self
    }

    /// Set the decoded-event channel capacity
    #[must_use]
    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }

    /// Set the flush retry policy
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the stream topic
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Get the size threshold that triggers a flush
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Get the age threshold that triggers a flush
    pub fn flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Get the decoded-event channel capacity
    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Get the flush retry policy
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }
}
