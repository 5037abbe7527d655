//! Error types for metric resolution and adapter startup

use std::net::SocketAddr;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Failure to resolve a metric query.
///
/// These are always returned to the caller; none of them is fatal.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No backend answer for the requested metric/object combination
    #[error("unable to fetch metrics for \"{metric}\": not found")]
    NotFound { metric: String },

    /// Query shape the backend does not implement
    #[error("unable to fetch metrics for \"{metric}\": {scope} queries are not supported")]
    Unsupported { metric: String, scope: &'static str },

    /// The backend itself failed
    #[error("backend error: {0}")]
    Backend(String),
}

impl ProviderError {
    pub fn not_found(metric: impl Into<String>) -> Self {
        ProviderError::NotFound {
            metric: metric.into(),
        }
    }

    pub fn unsupported(metric: impl Into<String>, scope: &'static str) -> Self {
        ProviderError::Unsupported {
            metric: metric.into(),
            scope,
        }
    }

    /// Whether callers should treat this as "no such metric"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ProviderError::NotFound { .. } | ProviderError::Unsupported { .. }
        )
    }

    /// Stable label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::NotFound { .. } => "not_found",
            ProviderError::Unsupported { .. } => "unsupported",
            ProviderError::Backend(_) => "backend_error",
        }
    }
}

/// Fatal adapter startup/run error
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to start server on {addr}: {source}")]
    RuntimeStart {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("server terminated with error: {0}")]
    Serve(#[source] std::io::Error),
}

impl From<config::ConfigError> for AdapterError {
    fn from(err: config::ConfigError) -> Self {
        AdapterError::Configuration(err.to_string())
    }
}
