//! Error types for the versioned metadata core.

use thiserror::Error;

/// Key/value storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Batch flushed more often than it was opened")]
    BatchUnderflow,
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Errors raised by the node model, linker, history walker and collector
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No such file or directory: {0}")]
    NoSuchFile(String),

    #[error("No such ref: {0}")]
    NoSuchRef(String),

    #[error("Bad node: {0}")]
    BadNode(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Nothing changed since the last commit")]
    NoChange,

    #[error("Stage contains uncommitted changes")]
    StageNotEmpty,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CoreError {
    /// True for any "absent" condition, whether raised by the core or the store.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_) | CoreError::Storage(StorageError::NotFound(_))
        )
    }

    pub(crate) fn bad_node(msg: impl Into<String>) -> Self {
        CoreError::BadNode(msg.into())
    }
}

impl From<config::ConfigError> for CoreError {
    fn from(err: config::ConfigError) -> Self {
        CoreError::Config(err.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(err: bincode::Error) -> Self {
        CoreError::BadNode(format!("failed to decode node: {}", err))
    }
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
