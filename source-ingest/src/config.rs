//! Configuration types for source ingestion

use std::time::Duration;

use subscription_sync::{ConfigError, DEFAULT_BATCH_SIZE};

/// Configuration for the Ingest reconciliation loop and the source loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Time between reconciliation ticks
    /// Default: 1 second
    pub interval: Duration,

    /// Page size used when loading sources
    /// Default: 10,000
    pub batch_size: usize,

    /// Log the source table after every successful load
    /// Default: false
    pub enable_debug: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            batch_size: DEFAULT_BATCH_SIZE,
            enable_debug: false,
        }
    }
}

impl IngestConfig {
    /// Create an IngestConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reconciliation interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the source loader page size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable table-content debug logging
    pub fn with_debug(mut self, enable_debug: bool) -> Self {
        self.enable_debug = enable_debug;
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    /// `ConfigError::InvalidInterval` for a zero interval and
    /// `ConfigError::InvalidBatchSize` for a zero batch size.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval.is_zero() {
            return Err(ConfigError::InvalidInterval(self.interval));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}

/// Receive settings shared by the workers of a queue-style adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuePollSettings {
    /// Maximum messages requested per receive
    /// Default: 10
    pub max_messages: usize,

    /// Long-poll wait per receive
    /// Default: 1 second
    pub wait_time: Duration,

    /// Pause after a failed receive before the next attempt
    /// Default: 1 second
    pub error_backoff: Duration,
}

impl Default for QueuePollSettings {
    fn default() -> Self {
        Self {
            max_messages: 10,
            wait_time: Duration::from_secs(1),
            error_backoff: Duration::from_secs(1),
        }
    }
}

impl QueuePollSettings {
    /// Settings for tests: tiny waits so loops turn over quickly
    pub fn fast() -> Self {
        Self {
            max_messages: 10,
            wait_time: Duration::from_millis(5),
            error_backoff: Duration::from_millis(5),
        }
    }
}
