//! Core error type definitions

use std::path::PathBuf;

/// Result type alias for saveback operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for saveback operations using thiserror
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// File system operations
    #[error("file system {operation} operation failed for '{}': {source}", .path.display())]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Encoding or decoding a dataset payload failed
    #[error("{format} {operation} failed: {message}")]
    Serialization {
        format: &'static str,
        operation: SerializationOp,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Direction of a failing serialization operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializationOp {
    Encode,
    Decode,
}

impl std::fmt::Display for SerializationOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializationOp::Encode => write!(f, "encode"),
            SerializationOp::Decode => write!(f, "decode"),
        }
    }
}
