//! Write-behind persistence for saveback
//!
//! This crate provides the persistence core:
//! - A versioned write-back cache of per-(user, dataset) key-value maps
//! - A single-worker save queue with ordered processing and a blocking drain
//! - An atomic file persistence engine that never corrupts durable state
//! - Pluggable serializer strategies for the on-disk payload format
//!
//! Reads and writes are instant and synchronous on the owning thread;
//! durability happens later on a background worker. A failed save re-arms the
//! entry as dirty so the data is retried by a later save, and an interrupted
//! save leaves the previous file untouched.

pub mod backend;
pub mod config;
pub mod engine;
pub mod entry;
pub mod queue;
pub mod serialization;
pub mod store;

pub use backend::{PersistenceBackend, SaveOutcome, SaveStatus, SaveTicket};
pub use config::StoreConfig;
pub use engine::PersistenceEngine;
pub use entry::EntryState;
pub use queue::{SaveQueue, SaveRequest};
pub use serialization::{BincodeSerializer, JsonSerializer, Serializer};
pub use store::UserStore;
