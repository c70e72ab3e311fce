//! Domain types for saveback

mod newtypes;
mod value;

pub use newtypes::UserId;
pub use value::{DatasetMap, FromValue, Value, ValueKind};
