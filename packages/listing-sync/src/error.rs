//! Typed errors for the sync engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can tell a
//! network failure from a malformed response or a storage problem.

use thiserror::Error;

/// Errors that can occur while refreshing a source.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network or HTTP failure
    #[error("fetch failed: {0}")]
    Transport(#[from] TransportError),

    /// Response did not have the expected shape
    #[error("unexpected response: {0}")]
    Parse(#[from] ParseError),

    /// Snapshot storage failed
    #[error("snapshot storage failed: {0}")]
    Persistence(#[from] PersistenceError),
}

/// Network/HTTP failures.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent or the body could not be read
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// HTTP client could not be configured
    #[error("failed to build HTTP client: {source}")]
    Client {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Server answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Request exceeded the configured timeout
    #[error("timeout fetching {url}")]
    Timeout { url: String },

    /// The site requires a session but the search response did not set one
    #[error("no session cookie received from {url}")]
    MissingSession { url: String },

    /// URL could not be built
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Unexpected response shapes and missing selector targets.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Body was not valid JSON or did not match the expected structure
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required field was absent
    #[error("missing field `{field}`")]
    MissingField { field: String },

    /// Body was syntactically valid but semantically unusable
    #[error("{reason}")]
    UnexpectedShape { reason: String },

    /// A CSS selector failed to compile
    #[error("invalid selector `{selector}`: {reason}")]
    Selector { selector: String, reason: String },
}

impl ParseError {
    pub fn shape(reason: impl Into<String>) -> Self {
        Self::UnexpectedShape {
            reason: reason.into(),
        }
    }
}

/// Snapshot storage failures.
#[derive(Debug, Error)]
pub enum PersistenceError {
    /// Filesystem read/write failed
    #[error("I/O error for `{key}`: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Stored document could not be decoded
    #[error("corrupt snapshot `{key}`: {reason}")]
    Corrupt { key: String, reason: String },

    /// Storage key escapes the store root or is empty
    #[error("invalid storage key `{key}`")]
    InvalidKey { key: String },

    /// In-memory store was told to fail (tests)
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

/// Result type alias for parsing.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

/// Result type alias for snapshot storage.
pub type PersistResult<T> = std::result::Result<T, PersistenceError>;

impl SyncError {
    /// True when the failure came from the remote source rather than local storage.
    pub fn is_upstream(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Parse(_))
    }
}
