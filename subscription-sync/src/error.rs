//! Error types for the subscription-sync crate.

/// Errors reported by repository implementations.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// The store could not be reached
    #[error("Repository unavailable: {0}")]
    Unavailable(String),

    /// The store did not answer in time
    #[error("Repository timeout: {0}")]
    Timeout(String),

    /// The store rejected or failed the query
    #[error("Query failed: {0}")]
    Query(String),
}

/// Errors from fetching subscription state.
///
/// A fetch error means nothing was applied: callers must not mutate the table
/// or their baseline with a partial result.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// A repository call failed
    #[error("{operation} failed: {source}")]
    Repository {
        /// The repository operation that failed
        operation: &'static str,
        /// Underlying repository error
        #[source]
        source: RepositoryError,
    },
}

impl FetchError {
    /// The repository operation that failed.
    pub fn operation(&self) -> &'static str {
        match self {
            FetchError::Repository { operation, .. } => operation,
        }
    }
}

/// Invalid loader configuration, raised at construction time.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The fetch page size must be positive
    #[error("Invalid batch size: {0} (must be greater than zero)")]
    InvalidBatchSize(usize),

    /// A periodic loop needs a non-zero period
    #[error("Invalid interval: {0:?} (must be greater than zero)")]
    InvalidInterval(std::time::Duration),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let error = RepositoryError::Unavailable("connection refused".to_string());
        assert_eq!(error.to_string(), "Repository unavailable: connection refused");

        let error = RepositoryError::Timeout("5s elapsed".to_string());
        assert_eq!(error.to_string(), "Repository timeout: 5s elapsed");

        let error = RepositoryError::Query("syntax".to_string());
        assert_eq!(error.to_string(), "Query failed: syntax");
    }

    #[test]
    fn test_fetch_error_carries_operation() {
        let error = FetchError::Repository {
            operation: "load_projects",
            source: RepositoryError::Timeout("db".to_string()),
        };

        assert_eq!(error.operation(), "load_projects");
        assert_eq!(error.to_string(), "load_projects failed: Repository timeout: db");
        assert!(std::error::Error::source(&error).is_some());
    }

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::InvalidBatchSize(0).to_string(),
            "Invalid batch size: 0 (must be greater than zero)"
        );
        assert_eq!(
            ConfigError::InvalidInterval(std::time::Duration::ZERO).to_string(),
            "Invalid interval: 0ns (must be greater than zero)"
        );
    }
}
