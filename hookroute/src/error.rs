use thiserror::Error;

use crate::logging::LoggingError;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Missing collaborator: {0}")]
    MissingComponent(&'static str),

    #[error("Table error: {0}")]
    Table(#[from] route_table::TableError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Routing core already started")]
    AlreadyStarted,

    #[error("Routing core has been shut down")]
    ShutDown,
}

impl From<subscription_sync::ConfigError> for RouterError {
    fn from(error: subscription_sync::ConfigError) -> Self {
        RouterError::Config(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
