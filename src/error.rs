//! Error types for astand

use std::io;

use thiserror::Error;

/// Errors raised by a [`Storage`](crate::storage::Storage) backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    #[error("Failed to create storage directory: {0}")]
    CreateDir(#[source] io::Error),

    #[error("Failed to read storage entry: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write storage entry: {0}")]
    Write(#[source] io::Error),

    #[error("Failed to remove storage entry: {0}")]
    Remove(#[source] io::Error),
}

/// Errors a middleware returns to reject or report a failed update.
#[derive(Debug, Error)]
pub enum MiddlewareError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to serialize state for key {key:?}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to persist state for key {key:?}: {source}")]
    Persist {
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("{0}")]
    Other(String),
}

impl MiddlewareError {
    /// Build an ad-hoc middleware error from a message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors returned by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Patch must be a JSON object, got {0}")]
    InvalidPatch(&'static str),

    #[error("State is not a JSON object and cannot be patched")]
    NotAnObject,
}
