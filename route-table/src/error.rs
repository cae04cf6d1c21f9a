//! Error types for the route-table crate.

/// Errors raised by the table registry.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    /// A table with this name is already registered
    #[error("Table already registered: {0}")]
    AlreadyRegistered(String),

    /// No table with this name is registered
    #[error("Table not registered: {0}")]
    NotRegistered(String),
}

/// Errors a [`Syncer`](crate::Syncer) reports to the scheduler driving it.
///
/// A sync error never implies the table was partially mutated by the failing
/// step; the scheduler logs it and retries on the next tick.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Pulling state from persistent storage failed
    #[error("Fetch failed: {0}")]
    Fetch(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The syncer was constructed with an invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The sync was interrupted before completion
    #[error("Sync aborted: {0}")]
    Aborted(String),
}

impl SyncError {
    /// Wrap any fetch-side error.
    pub fn fetch<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Fetch(Box::new(error))
    }
}
