//! Conversions from external error types

use super::types::Error;

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Error::Json {
            message: source.to_string(),
            source,
        }
    }
}
