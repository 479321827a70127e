//! Serialization error types

use thiserror::Error;

use crate::graph::GraphError;

/// Errors that can occur during graph export/import
#[derive(Error, Debug)]
pub enum SerializationError {
    /// IO error reading/writing files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing/serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Schema version mismatch
    #[error("version mismatch: file is v{file_major}.{file_minor}, expected v{expected_major}.x")]
    VersionMismatch {
        file_major: u32,
        file_minor: u32,
        expected_major: u32,
    },

    /// The file does not describe a well-formed graph
    #[error("malformed graph file: {0}")]
    Malformed(String),

    /// Graph-level failure while rebuilding the imported structure
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Result type for serialization operations
pub type Result<T> = std::result::Result<T, SerializationError>;
