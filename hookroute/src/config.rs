//! Configuration for the routing core

use std::time::Duration;

use source_ingest::IngestConfig;
use subscription_sync::{LoaderConfig, DEFAULT_BATCH_SIZE};

use crate::error::RouterError;

pub const BATCH_SIZE_ENV: &str = "HOOKROUTE_BATCH_SIZE";
pub const ENABLE_DEBUG_ENV: &str = "HOOKROUTE_ENABLE_DEBUG";
pub const SYNC_INTERVAL_ENV: &str = "HOOKROUTE_SYNC_INTERVAL_SECS";
pub const INGEST_INTERVAL_ENV: &str = "HOOKROUTE_INGEST_INTERVAL_MS";

/// Configuration for [`RoutingCore`](crate::RoutingCore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouterConfig {
    /// Page size for subscription and source fetches
    /// Default: 10,000
    pub batch_size: usize,

    /// Log table contents after every successful sync
    /// Default: false
    pub enable_debug: bool,

    /// Time between loader syncs
    /// Default: 10 seconds
    pub sync_interval: Duration,

    /// Time between Ingest reconciliation ticks
    /// Default: 1 second
    pub ingest_interval: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            enable_debug: false,
            sync_interval: Duration::from_secs(10),
            ingest_interval: Duration::from_secs(1),
        }
    }
}

impl RouterConfig {
    /// Create a RouterConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_debug(mut self, enable_debug: bool) -> Self {
        self.enable_debug = enable_debug;
        self
    }

    pub fn with_sync_interval(mut self, interval: Duration) -> Self {
        self.sync_interval = interval;
        self
    }

    pub fn with_ingest_interval(mut self, interval: Duration) -> Self {
        self.ingest_interval = interval;
        self
    }

    /// Short intervals for tests and local runs
    pub fn fast_polling() -> Self {
        Self {
            sync_interval: Duration::from_millis(20),
            ingest_interval: Duration::from_millis(10),
            ..Self::default()
        }
    }

    /// Defaults overridden by `HOOKROUTE_*` environment variables
    ///
    /// # Errors
    /// `RouterError::Config` when a variable is set but does not parse.
    pub fn from_env() -> Result<Self, RouterError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, RouterError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(BATCH_SIZE_ENV) {
            config.batch_size = parse_number(BATCH_SIZE_ENV, &value)? as usize;
        }
        if let Some(value) = lookup(ENABLE_DEBUG_ENV) {
            config.enable_debug = parse_flag(ENABLE_DEBUG_ENV, &value)?;
        }
        if let Some(value) = lookup(SYNC_INTERVAL_ENV) {
            config.sync_interval = Duration::from_secs(parse_number(SYNC_INTERVAL_ENV, &value)?);
        }
        if let Some(value) = lookup(INGEST_INTERVAL_ENV) {
            config.ingest_interval =
                Duration::from_millis(parse_number(INGEST_INTERVAL_ENV, &value)?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable
    ///
    /// # Errors
    /// `RouterError::Config` for a zero batch size or a zero interval.
    pub fn validate(&self) -> Result<(), RouterError> {
        self.loader_config()
            .validate()
            .map_err(|e| RouterError::Config(e.to_string()))?;

        if self.sync_interval.is_zero() {
            return Err(RouterError::Config("sync_interval must be greater than zero".to_string()));
        }
        if self.ingest_interval.is_zero() {
            return Err(RouterError::Config(
                "ingest_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for the subscription loader
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig::new()
            .with_batch_size(self.batch_size)
            .with_debug(self.enable_debug)
    }

    /// Settings for the Ingest loop and the source loader
    pub fn ingest_config(&self) -> IngestConfig {
        IngestConfig::new()
            .with_interval(self.ingest_interval)
            .with_batch_size(self.batch_size)
            .with_debug(self.enable_debug)
    }
}

fn parse_number(name: &str, value: &str) -> Result<u64, RouterError> {
    value
        .trim()
        .parse()
        .map_err(|_| RouterError::Config(format!("{name} must be a non-negative integer, got {value:?}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, RouterError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(RouterError::Config(format!("{name} must be a boolean, got {value:?}"))),
    }
}
