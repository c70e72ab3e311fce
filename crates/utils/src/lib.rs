//! Shared filesystem utilities for saveback
//!
//! This crate provides the small, pure helpers the persistence engine is
//! built on: crash-safe file replacement and storage-root resolution.

pub mod atomic_file;
pub mod xdg;

pub use atomic_file::*;
pub use xdg::*;
