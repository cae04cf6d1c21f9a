//! Configuration types for the subscription loader

use crate::error::ConfigError;

/// Default number of rows requested per repository page.
pub const DEFAULT_BATCH_SIZE: usize = 10_000;

/// Configuration for the subscription loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Page size used for every repository fetch
    /// Default: 10,000
    pub batch_size: usize,

    /// Log the full table contents after every successful sync
    /// Default: false
    pub enable_debug: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            enable_debug: false,
        }
    }
}

impl LoaderConfig {
    /// Create a LoaderConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fetch page size
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Enable or disable table-content debug logging
    pub fn with_debug(mut self, enable_debug: bool) -> Self {
        self.enable_debug = enable_debug;
        self
    }

    /// Reject configurations the loader cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::InvalidBatchSize(self.batch_size));
        }
        Ok(())
    }
}
