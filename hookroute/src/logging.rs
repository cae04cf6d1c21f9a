//! Logging bootstrap for processes embedding the routing core
//!
//! Library crates in this workspace only emit `tracing` events. This module
//! installs the global subscriber once, picking the output format from a
//! [`LoggingMode`] or from the environment.

use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Environment variable selecting the mode in [`init_logging_from_env`]
pub const LOG_MODE_ENV: &str = "HOOKROUTE_LOG_MODE";

/// Environment variable overriding the filter directive
pub const LOG_LEVEL_ENV: &str = "HOOKROUTE_LOG_LEVEL";

/// Output format of the global subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingMode {
    /// No subscriber is installed
    Silent,
    /// Compact stderr output at `info`
    Development,
    /// Pretty output with thread ids and source locations at `debug`
    Debug,
    /// One JSON object per event at `info`, for log shippers
    Json,
}

impl LoggingMode {
    /// Parse a mode name as accepted in `HOOKROUTE_LOG_MODE`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "silent" => Some(Self::Silent),
            "development" | "dev" => Some(Self::Development),
            "debug" => Some(Self::Debug),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    fn default_level(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            _ => "info",
        }
    }
}

/// Logging configuration error
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),

    #[error("Invalid environment variable: {0}")]
    InvalidEnv(String),
}

/// Install the global subscriber for `mode`
///
/// # Environment Variables
///
/// - `HOOKROUTE_LOG_LEVEL`: filter directive, e.g. `source_ingest=debug,info`
/// - `RUST_LOG`: used when `HOOKROUTE_LOG_LEVEL` is unset
///
/// # Errors
/// `LoggingError::TracingInit` if a global subscriber is already set.
pub fn init_logging(mode: LoggingMode) -> Result<(), LoggingError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let subscriber_err = |e: tracing_subscriber::util::TryInitError| {
        LoggingError::TracingInit(e.to_string())
    };

    match mode {
        LoggingMode::Silent => Ok(()),
        LoggingMode::Development => Registry::default()
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false)
                    .compact(),
            )
            .with(create_env_filter(mode.default_level()))
            .try_init()
            .map_err(subscriber_err),
        LoggingMode::Debug => Registry::default()
            .with(
                fmt::layer()
                    .pretty()
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with(create_env_filter(mode.default_level()))
            .try_init()
            .map_err(subscriber_err),
        LoggingMode::Json => Registry::default()
            .with(fmt::layer().json().with_current_span(false).with_target(true))
            .with(create_env_filter(mode.default_level()))
            .try_init()
            .map_err(subscriber_err),
    }
}

/// Install the subscriber named by `HOOKROUTE_LOG_MODE`
///
/// An unset variable means [`LoggingMode::Silent`].
///
/// # Errors
/// `LoggingError::InvalidEnv` for an unknown mode name, otherwise as
/// [`init_logging`].
pub fn init_logging_from_env() -> Result<(), LoggingError> {
    let mode = match std::env::var(LOG_MODE_ENV) {
        Ok(name) => LoggingMode::from_name(&name)
            .ok_or_else(|| LoggingError::InvalidEnv(format!("{LOG_MODE_ENV}={name}")))?,
        Err(_) => LoggingMode::Silent,
    };

    init_logging(mode)
}

fn create_env_filter(default_level: &str) -> EnvFilter {
    if let Ok(level) = std::env::var(LOG_LEVEL_ENV) {
        EnvFilter::new(level)
    } else if let Ok(rust_log) = std::env::var("RUST_LOG") {
        EnvFilter::new(rust_log)
    } else {
        EnvFilter::new(default_level)
    }
}

/// Whether a global subscriber has been installed
pub fn is_initialized() -> bool {
    tracing::dispatcher::has_been_set()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_mode_installs_nothing() {
        assert!(init_logging(LoggingMode::Silent).is_ok());
    }

    #[test]
    fn test_mode_names() {
        assert_eq!(LoggingMode::from_name("JSON"), Some(LoggingMode::Json));
        assert_eq!(LoggingMode::from_name(" dev "), Some(LoggingMode::Development));
        assert_eq!(LoggingMode::from_name("debug"), Some(LoggingMode::Debug));
        assert_eq!(LoggingMode::from_name("loud"), None);
    }

    #[test]
    fn test_second_init_is_an_error() {
        // Whichever call installs first wins; a later one must not panic
        let _ = init_logging(LoggingMode::Json);
        assert!(is_initialized());
        assert!(matches!(
            init_logging(LoggingMode::Development),
            Err(LoggingError::TracingInit(_))
        ));
    }
}
