//! Error types for the source-ingest crate.

use crate::types::{SourceId, SourceType};

/// A source configuration no adapter can be built from.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum SourceConfigError {
    /// Sources need at least one worker
    #[error("Invalid worker count: {0} (must be greater than zero)")]
    InvalidWorkerCount(u32),

    /// A required provider setting is empty
    #[error("Missing {field} for {provider} source")]
    MissingField {
        /// The provider family
        provider: SourceType,
        /// The missing setting
        field: &'static str,
    },

    /// No adapter builder is registered for this provider family
    #[error("No adapter registered for source type: {0}")]
    UnsupportedType(SourceType),
}

/// Errors talking to a message provider.
///
/// All variants are transient from a worker's point of view: they are logged
/// and the next receive is attempted after a backoff.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    /// Credentials were rejected
    #[error("Provider authentication failed: {0}")]
    Auth(String),

    /// The provider could not be reached
    #[error("Provider network error: {0}")]
    Network(String),

    /// The provider answered with something unexpected
    #[error("Provider protocol error: {0}")]
    Protocol(String),
}

/// Errors starting or stopping a consumer adapter.
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// The source configuration is invalid
    #[error("Invalid source configuration: {0}")]
    Config(#[from] SourceConfigError),

    /// Connecting to the provider failed
    #[error("Failed to connect: {0}")]
    Connect(#[from] ProviderError),

    /// `start` was called on a running adapter
    #[error("Adapter already started: {0}")]
    AlreadyStarted(SourceId),
}

/// Errors enqueueing outbound work.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    /// The queue rejected the write
    #[error("Queue write failed: {0}")]
    Write(String),

    /// The job could not be serialized
    #[error("Job encoding failed: {0}")]
    Encode(String),
}

/// Errors handling one inbound message.
///
/// A handler error leaves the message unacknowledged so the provider
/// redelivers it.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The body is not a valid event envelope
    #[error("Malformed message: {0}")]
    Malformed(String),

    /// The envelope decoded but is missing required fields
    #[error("Invalid event request: {0}")]
    Invalid(String),

    /// Writing the create-event job failed
    #[error("Failed to enqueue event: {0}")]
    Queue(#[from] QueueError),
}

/// Errors reported by the source pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Building or starting the adapter for a source failed
    #[error("Failed to start adapter for source {source_id}: {error}")]
    Start {
        /// The source whose adapter failed
        source_id: SourceId,
        /// Underlying adapter error
        #[source]
        error: AdapterError,
    },

    /// The pool has been shut down
    #[error("Source pool is shut down")]
    ShutDown,
}

/// Result of a [`SourcePool`](crate::SourcePool) operation.
pub type PoolResult<T> = std::result::Result<T, PoolError>;
