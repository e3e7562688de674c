//! Error types for the Graph transport.

use sharepath_core::{LibraryError, StoreError};
use thiserror::Error;

/// Errors that can occur when talking to Microsoft Graph.
#[derive(Error, Debug)]
pub enum GraphError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Settings rejected before any request was made
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The token endpoint refused the credentials
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    /// Graph rejected the access token
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Building the client assertion failed
    #[error("Failed to sign client assertion: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// The addressed item does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// The target name is taken
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited by Graph
    #[error("Rate limited, retry after {retry_after_secs} seconds")]
    RateLimited { retry_after_secs: u64 },

    /// Graph returned an error response
    #[error("Graph error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Failed to parse a Graph response
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// No document library on the site has the configured title
    #[error("Library '{title}' not found on site (available: {available:?})")]
    LibraryNotFound {
        title: String,
        available: Vec<String>,
    },
}

/// Result type for Graph operations.
pub type Result<T> = std::result::Result<T, GraphError>;

impl From<GraphError> for StoreError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::NotFound(what) => StoreError::NotFound(what),
            GraphError::Conflict(what) => StoreError::AlreadyExists(what),
            GraphError::Unauthorized(message) | GraphError::AuthFailed(message) => {
                StoreError::Unauthorized(message)
            }
            GraphError::RateLimited { retry_after_secs } => {
                StoreError::RateLimited { retry_after_secs }
            }
            GraphError::Api { status, message } => StoreError::Server { status, message },
            other => StoreError::other(other),
        }
    }
}

impl From<GraphError> for LibraryError {
    fn from(error: GraphError) -> Self {
        match error {
            GraphError::Configuration(message) => LibraryError::Configuration(message),
            e @ GraphError::LibraryNotFound { .. } => LibraryError::Configuration(e.to_string()),
            other => LibraryError::Transport(other.into()),
        }
    }
}
