//! Error types for saveback operations

mod builders;
mod conversions;
mod types;

pub use types::{Error, Result, SerializationOp};
