//! Error taxonomy
//!
//! Nothing here is fatal once the monitor is running: every variant is logged
//! by the scheduler and the loop carries on with the next cycle.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failures of the catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Network error, timeout or non-2xx response. The cycle is skipped.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// The vendor answered but the JSON did not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The HTTP client could not be constructed.
    #[error("catalog client setup failed: {0}")]
    Setup(String),
}

impl From<reqwest::Error> for CatalogError {
    fn from(e: reqwest::Error) -> Self {
        CatalogError::UpstreamUnavailable(e.to_string())
    }
}

/// Failure of a single notification sink.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("sink timed out after {0:?}")]
    Timeout(Duration),

    #[error("sink task crashed: {0}")]
    Crashed(String),
}

impl From<reqwest::Error> for SinkError {
    fn from(e: reqwest::Error) -> Self {
        SinkError::Unavailable(e.to_string())
    }
}

impl From<std::io::Error> for SinkError {
    fn from(e: std::io::Error) -> Self {
        SinkError::Unavailable(e.to_string())
    }
}

/// Failure to read or rewrite the product identity cache.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("product cache is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

impl PersistenceError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PersistenceError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    #[error("Unknown argument: {0}")]
    UnknownArgument(String),
}
