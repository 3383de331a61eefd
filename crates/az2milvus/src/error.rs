//! Error types for az2milvus.
//!
//! Conversion never fails: unknown types and algorithms degrade to documented
//! defaults and surface as warnings on the result. The variants below cover
//! configuration, connector I/O, checkpoint persistence and run control.

use thiserror::Error;

/// Result type alias for az2milvus operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while assessing or migrating an index.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The source service could not be reached or returned an error.
    #[error("Source connection error: {0}")]
    SourceConnection(String),

    /// Credentials were rejected by a remote service.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A remote service throttled the request; value is the suggested wait in seconds.
    #[error("Rate limited, retry after {0}s")]
    RateLimit(u64),

    /// Documents or schema could not be read from the source.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Records could not be written to the target.
    #[error("Loading error: {0}")]
    Loading(String),

    /// The target service could not be reached or returned an error.
    #[error("Destination error: {0}")]
    DestinationConnection(String),

    /// A target operation was attempted before `connect()`.
    #[error("Not connected to {0}; call connect() first")]
    NotConnected(&'static str),

    /// Checkpoint file could not be read or written.
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// Another run holds the checkpoint lock for this index.
    #[error("Checkpoint for index '{index}' is locked by another run ({path})")]
    CheckpointLocked {
        /// Source index name.
        index: String,
        /// Lock file path.
        path: String,
    },

    /// The run was aborted between batches.
    #[error("Migration cancelled")]
    Cancelled,

    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML configuration parse error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Returns true when the error aborts a run rather than a single call.
    ///
    /// Cancellation and lock contention are control-flow outcomes; the caller
    /// reports them differently from service failures.
    #[must_use]
    pub const fn is_run_control(&self) -> bool {
        matches!(self, Self::Cancelled | Self::CheckpointLocked { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_context() {
        let err = Error::CheckpointLocked {
            index: "products".to_string(),
            path: ".checkpoints/products.lock".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("products"));
        assert!(msg.contains(".lock"));
    }

    #[test]
    fn test_not_connected_message() {
        let err = Error::NotConnected("Milvus");
        assert_eq!(err.to_string(), "Not connected to Milvus; call connect() first");
    }

    #[test]
    fn test_run_control_classification() {
        assert!(Error::Cancelled.is_run_control());
        assert!(!Error::Loading("boom".to_string()).is_run_control());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
