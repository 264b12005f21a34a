//! Error types for media-cover-sync
//!
//! Cover synchronization is best-effort: most of these errors are caught by the
//! service and turned into log entries so that one bad asset never blocks its
//! siblings. The variants still carry enough context (URL, path, status) to make
//! those log entries useful.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for media-cover-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-cover-sync
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "url_base")
        key: Option<String>,
    },

    /// Transport-level failure talking to a remote asset host
    #[error("network error for {url}: {message}")]
    Network {
        /// The URL being requested
        url: String,
        /// Underlying transport error
        message: String,
    },

    /// The remote host answered with a non-success status
    #[error("HTTP {status} from {url}")]
    HttpStatus {
        /// The URL being requested
        url: String,
        /// HTTP status code returned by the server
        status: u16,
    },

    /// A remote asset URL could not be parsed
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Downloading an asset body failed after the request was accepted
    #[error("download failed for {url}: {message}")]
    Download {
        /// The URL being downloaded
        url: String,
        /// What went wrong
        message: String,
    },

    /// Producing a resized variant failed
    #[error("resize failed for {}: {message}", path.display())]
    Resize {
        /// The source image path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The worker queue is closed and no longer accepts events
    #[error("event channel closed")]
    ChannelClosed,

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Whether this error came from the network rather than local processing.
    ///
    /// Network failures are expected from time to time (hosts go away, mirrors
    /// rate-limit) and are logged at warn level; everything else is an error.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. } | Error::HttpStatus { .. })
    }

    pub(crate) fn network(url: &str, err: impl std::fmt::Display) -> Self {
        Error::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
