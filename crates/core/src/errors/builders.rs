//! Builder methods for creating errors with context

use super::types::{Error, SerializationOp};
use std::path::PathBuf;

// Helper methods for creating errors with context
impl Error {
    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a serialization error without an underlying source
    #[must_use]
    pub fn serialization(
        format: &'static str,
        operation: SerializationOp,
        message: impl Into<String>,
    ) -> Self {
        Error::Serialization {
            format,
            operation,
            message: message.into(),
            source: None,
        }
    }

    /// Create a serialization error with a source error
    #[must_use]
    pub fn serialization_with_source(
        format: &'static str,
        operation: SerializationOp,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        let source = source.into();
        Error::Serialization {
            format,
            operation,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }
}
