//! Error types for path-addressed library operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by a remote store implementation.
///
/// These are transport-level outcomes. The resolver and the operation layer
/// translate `NotFound` and `AlreadyExists` into [`LibraryError`] kinds and
/// pass the rest through as [`LibraryError::Transport`].
#[derive(Error, Debug)]
pub enum StoreError {
    /// The addressed item does not exist
    #[error("Remote item not found: {0}")]
    NotFound(String),

    /// An item with the requested name already exists
    #[error("Remote item already exists: {0}")]
    AlreadyExists(String),

    /// Credentials were rejected or have expired
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The remote service is throttling requests
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Any other unsuccessful response
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// Network, decoding or other failure inside the transport
    #[error("Transport failure: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap an arbitrary error as an opaque transport failure.
    pub fn other<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Other(error.into())
    }
}

/// Caller-facing error taxonomy.
///
/// Every kind is a distinct variant so callers can tell "already exists",
/// "not found" and "network failure" apart.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// Bad construction parameters
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Malformed path supplied by the caller
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Malformed leaf name supplied by the caller
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Resolution or operation target is absent remotely
    #[error("Not found: '{path}' (missing '{segment}')")]
    NotFound { path: String, segment: String },

    /// A path segment that must be a folder names a file
    #[error("'{0}' is not a folder")]
    NotAFolder(String),

    /// More than one remote item matches a path segment
    #[error("'{path}' is ambiguous: {candidates:?}")]
    Ambiguous {
        path: String,
        candidates: Vec<String>,
    },

    /// Creating an intermediate folder failed.
    ///
    /// Folders up to and including `committed` stay in place.
    #[error("Failed to create folder '{segment}' (depth {depth}) under '{committed}': {source}")]
    FolderCreation {
        segment: String,
        depth: usize,
        committed: String,
        #[source]
        source: StoreError,
    },

    /// The destination name is taken and the conflict policy rejects it
    #[error("Conflict: '{0}' already exists")]
    Conflict(String),

    /// The local file to upload does not exist
    #[error("Local file not found: {0}")]
    LocalFileNotFound(PathBuf),

    /// Local read or write failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Opaque failure from the remote store
    #[error(transparent)]
    Transport(#[from] StoreError),
}

impl LibraryError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(path: impl Into<String>, segment: impl Into<String>) -> Self {
        Self::NotFound {
            path: path.into(),
            segment: segment.into(),
        }
    }

    /// True for `NotFound`, including a not-found reported by the transport.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Transport(StoreError::NotFound(_))
        )
    }
}

/// Result type for library operations.
pub type Result<T> = std::result::Result<T, LibraryError>;

/// Result type for remote store calls.
pub type StoreResult<T> = std::result::Result<T, StoreError>;
