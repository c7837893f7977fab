//! Error kinds surfaced by dump workers.

use std::path::PathBuf;

use thiserror::Error;

/// Everything that can end a dump run.
///
/// None of these are retried: a worker that hits one stops, and the supervisor
/// treats it as fatal for the whole run.
#[derive(Debug, Error)]
pub enum DumpError {
    /// Malformed configuration, e.g. an interval like `"xh"`.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The database session could not be established.
    #[error("failed to connect to {url}: {message}")]
    Connection {
        /// Connection string with credentials stripped.
        url: String,
        /// Driver message.
        message: String,
    },

    /// Fetching documents from a collection failed.
    #[error("failed to fetch documents from collection '{collection}': {message}")]
    Query {
        /// Collection being fetched.
        collection: String,
        /// Driver message.
        message: String,
    },

    /// Creating a snapshot directory or writing a snapshot file failed.
    #[error("filesystem error at {}: {source}", path.display())]
    Filesystem {
        /// Path that was being created or written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A snapshot could not be encoded as JSON.
    #[error("failed to encode snapshot of '{collection}': {source}")]
    Serialize {
        /// Collection being encoded.
        collection: String,
        /// Underlying encoder error.
        #[source]
        source: serde_json::Error,
    },
}

impl DumpError {
    pub(crate) fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, DumpError>;
