//! Core domain types, errors, and constants for the `saveback` persistence
//! layer.
//!
//! This crate establishes the foundational data structures and error handling
//! mechanisms used throughout the workspace. It performs no I/O.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing all possible failure modes for predictable error handling.
//! - **`types`**: Contains the closed [`Value`](types::Value) variant type
//!   stored in datasets, plus newtype wrappers like [`UserId`](types::UserId)
//!   that enforce invariants at the type level.
//! - **`constants`**: Shared static constants such as the application
//!   directory name and on-disk naming conventions.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, SerializationOp},
    types::*,
};
