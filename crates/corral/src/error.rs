//! Error types for pool operations
use std::time::Duration;

use thiserror::Error;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error type accepted at the factory boundary.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error type for pool operations.
///
/// Factory failures never unwind through `acquire`/`release` directly; they
/// are routed into pool bookkeeping and surface only as the rejection of a
/// specific acquire (see [`Error::CreateFailed`]).
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid
    #[error("configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// Operation issued after the pool left the running state
    #[error("pool is shut down")]
    Shutdown,

    /// A waiter exceeded its acquire deadline
    #[error("acquire timed out after {waited:?}")]
    AcquireTimeout {
        /// How long the acquire waited before giving up
        waited: Duration,
    },

    /// The factory failed to create a resource
    #[error("factory failed to create resource")]
    CreateFailed {
        /// The underlying factory error
        #[source]
        source: BoxError,
    },

    /// Clear was requested while the pool still had loans outstanding
    #[error("pool is not drained: {borrowed} resource(s) still borrowed")]
    NotDrained {
        /// Number of resources still on loan
        borrowed: usize,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a factory creation failure
    pub fn create_failed(source: impl Into<BoxError>) -> Self {
        Self::CreateFailed {
            source: source.into(),
        }
    }

    /// Check if this error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AcquireTimeout { .. } => true,
            Self::CreateFailed { .. } => true,
            Self::Configuration { .. } | Self::Shutdown | Self::NotDrained { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_create_failures_are_retryable() {
        let timeout = Error::AcquireTimeout {
            waited: Duration::from_millis(50),
        };
        assert!(timeout.is_retryable());

        let create = Error::create_failed("connection refused");
        assert!(create.is_retryable());

        assert!(!Error::Shutdown.is_retryable());
        assert!(!Error::configuration("min > max").is_retryable());
        assert!(!Error::NotDrained { borrowed: 2 }.is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = Error::NotDrained { borrowed: 3 };
        assert!(err.to_string().contains("3 resource(s)"));

        let err = Error::configuration("priority_range must be at least 1");
        assert!(err.to_string().contains("priority_range"));
    }
}
