//! The user-facing versioned write-back cache
//!
//! A [`UserStore`] owns every resident (user, dataset) entry and is the one
//! object call sites receive; there is no process-wide registry. Reads and
//! mutations are synchronous and designed for a single owning thread, while
//! persistence proceeds independently in the background.

use crate::backend::{PersistenceBackend, SaveOutcome, SaveTicket};
use crate::config::StoreConfig;
use crate::engine::PersistenceEngine;
use crate::entry::CacheEntry;
use saveback_core::{FromValue, UserId, Value};
use std::collections::HashMap;
use std::sync::Arc;


/// Synchronous per-(user, dataset) key-value cache with write-behind
/// persistence.
///
/// Every dataset must be [`preload`](UserStore::preload)ed before it is read
/// or mutated; accessing an unloaded dataset degrades to a warning and the
/// caller-supplied default. Mutations bump the entry's version and mark it
/// dirty; [`save`](UserStore::save) captures a snapshot and hands it to the
/// persistence backend without blocking the caller.
pub struct UserStore {
    backend: Arc<dyn PersistenceBackend>,
    data_dir: String,
    entries: HashMap<UserId, HashMap<String, CacheEntry>>,
    active_user: UserId,
}

impl UserStore {
    /// Create a store persisting through the atomic file engine
    pub fn new(config: StoreConfig) -> Self {
        let backend = Arc::new(PersistenceEngine::new(config.root, config.serializer));
        Self::with_backend(backend, config.data_dir)
    }

    /// Create a store over an injected persistence backend
    pub fn with_backend(
        backend: Arc<dyn PersistenceBackend>,
        data_dir: impl Into<String>,
    ) -> Self {
        Self {
            backend,
            data_dir: data_dir.into(),
            entries: HashMap::new(),
            active_user: UserId::new(0),
        }
    }

    /// The user targeted by the `*_active` convenience methods
    pub fn active_user(&self) -> UserId {
        self.active_user
    }

    pub fn set_active_user(&mut self, user: UserId) {
        self.active_user = user;
    }

    /// Make `(user, dataset)` resident, loading existing data through the
    /// backend or starting empty when there is none (or the load failed).
    ///
    /// Idempotent: a dataset that is already resident is left untouched.
    /// Get/Set are valid for the pair as soon as this returns.
    pub fn preload(&mut self, user: UserId, dataset: &str) {
        if !is_valid_dataset_name(dataset) {
            tracing::warn!("invalid dataset name '{dataset}'; ignoring preload");
            return;
        }
        if self.is_loaded(user, dataset) {
            return;
        }
        let values = self.backend.load(user, &self.data_dir, dataset);
        self.entries
            .entry(user)
            .or_default()
            .insert(dataset.to_string(), CacheEntry::new(values));
    }

    /// Whether `(user, dataset)` is resident
    pub fn is_loaded(&self, user: UserId, dataset: &str) -> bool {
        self.entry(user, dataset).is_some()
    }

    /// Whether the resident dataset holds `key`
    pub fn has_key(&self, user: UserId, key: &str, dataset: &str) -> bool {
        self.entry(user, dataset)
            .is_some_and(|entry| entry.has_key(key))
    }

    /// Read `key`, falling back to `default` when the dataset is not loaded,
    /// the key is absent, or the stored value has an incompatible kind.
    pub fn get<T: FromValue>(&self, user: UserId, key: &str, default: T, dataset: &str) -> T {
        let Some(entry) = self.entry(user, dataset) else {
            tracing::warn!(
                "get on dataset '{dataset}' for user {user} before preload; \
                 returning default for '{key}'"
            );
            return default;
        };
        let Some(value) = entry.get(key) else {
            return default;
        };
        match T::from_value(value) {
            Some(typed) => typed,
            None => {
                tracing::debug!(
                    "stored {} under '{key}' does not match the requested type; \
                     returning default",
                    value.kind()
                );
                default
            }
        }
    }

    /// Store `value` under `key`. Bumps the version and marks the entry
    /// dirty only when the stored state actually changes.
    pub fn set(&mut self, user: UserId, key: &str, value: impl Into<Value>, dataset: &str) {
        if let Some(entry) = self.entry_mut(user, dataset, "set") {
            entry.set(key, value.into());
        }
    }

    /// Remove `key`; deleting an absent key leaves version and dirty alone
    pub fn delete_key(&mut self, user: UserId, key: &str, dataset: &str) {
        if let Some(entry) = self.entry_mut(user, dataset, "delete_key") {
            entry.delete_key(key);
        }
    }

    /// Empty the dataset; clearing an already empty map is a no-op
    pub fn clear(&mut self, user: UserId, dataset: &str) {
        if let Some(entry) = self.entry_mut(user, dataset, "clear") {
            entry.clear();
        }
    }

    /// Persist the dataset if it has unsaved mutations.
    ///
    /// Captures a snapshot, optimistically clears dirty, and hands the
    /// snapshot to the backend. A backend that completes the hand-off
    /// synchronously needs no tracking and `None` is returned. A pending
    /// save returns its ticket, and completion handling reconciles the entry
    /// once it settles: a mutation that landed during the save window
    /// re-arms dirty, as does a failed save.
    pub fn save(&mut self, user: UserId, dataset: &str) -> Option<SaveTicket> {
        let Some(entry) = self
            .entries
            .get_mut(&user)
            .and_then(|datasets| datasets.get_mut(dataset))
        else {
            tracing::warn!("save on dataset '{dataset}' for user {user} before preload; ignoring");
            return None;
        };
        if !entry.state().is_dirty() {
            return None;
        }

        let snapshot = entry.snapshot();
        let snapshot_version = entry.state().begin_save();

        match self.backend.save(user, &self.data_dir, dataset, snapshot) {
            SaveOutcome::CompletedSynchronously => None,
            SaveOutcome::SubmittedAsync(ticket) => {
                entry.state().mark_saving();
                let state = Arc::clone(entry.state());
                ticket.on_settle(move |status| state.settle_save(snapshot_version, status));
                Some(ticket)
            }
        }
    }

    /// Save every resident dataset and wait for all pending saves to settle
    pub fn save_all(&mut self) {
        let targets: Vec<(UserId, String)> = self
            .entries
            .iter()
            .flat_map(|(user, datasets)| datasets.keys().map(move |name| (*user, name.clone())))
            .collect();

        let mut pending = Vec::new();
        for (user, dataset) in targets {
            if let Some(ticket) = self.save(user, &dataset) {
                pending.push(ticket);
            }
        }
        for ticket in pending {
            ticket.wait();
        }
    }

    /// Drop the resident entry. No persistence side effect: unsaved
    /// mutations are discarded.
    pub fn unload(&mut self, user: UserId, dataset: &str) {
        if let Some(datasets) = self.entries.get_mut(&user) {
            datasets.remove(dataset);
            if datasets.is_empty() {
                self.entries.remove(&user);
            }
        }
    }

    /// Block until the backend has processed every accepted save. The one
    /// intentional blocking operation, for shutdown-time guarantees.
    pub fn flush(&self) {
        self.backend.flush();
    }

    /// Version counter of a resident dataset
    pub fn version(&self, user: UserId, dataset: &str) -> Option<u64> {
        self.entry(user, dataset).map(|entry| entry.state().version())
    }

    /// Whether a resident dataset has mutations not yet captured by a
    /// successfully saved snapshot
    pub fn is_dirty(&self, user: UserId, dataset: &str) -> bool {
        self.entry(user, dataset)
            .is_some_and(|entry| entry.state().is_dirty())
    }

    /// Whether a pending save is currently being tracked for the dataset
    pub fn is_saving(&self, user: UserId, dataset: &str) -> bool {
        self.entry(user, dataset)
            .is_some_and(|entry| entry.state().is_saving())
    }

    // Active-user convenience forms

    pub fn preload_active(&mut self, dataset: &str) {
        self.preload(self.active_user, dataset);
    }

    pub fn is_loaded_active(&self, dataset: &str) -> bool {
        self.is_loaded(self.active_user, dataset)
    }

    pub fn has_key_active(&self, key: &str, dataset: &str) -> bool {
        self.has_key(self.active_user, key, dataset)
    }

    pub fn get_active<T: FromValue>(&self, key: &str, default: T, dataset: &str) -> T {
        self.get(self.active_user, key, default, dataset)
    }

    pub fn set_active(&mut self, key: &str, value: impl Into<Value>, dataset: &str) {
        self.set(self.active_user, key, value, dataset);
    }

    pub fn delete_key_active(&mut self, key: &str, dataset: &str) {
        self.delete_key(self.active_user, key, dataset);
    }

    pub fn clear_active(&mut self, dataset: &str) {
        self.clear(self.active_user, dataset);
    }

    pub fn save_active(&mut self, dataset: &str) -> Option<SaveTicket> {
        self.save(self.active_user, dataset)
    }

    pub fn unload_active(&mut self, dataset: &str) {
        self.unload(self.active_user, dataset);
    }

    fn entry(&self, user: UserId, dataset: &str) -> Option<&CacheEntry> {
        self.entries
            .get(&user)
            .and_then(|datasets| datasets.get(dataset))
    }

    fn entry_mut(&mut self, user: UserId, dataset: &str, op: &str) -> Option<&mut CacheEntry> {
        let entry = self
            .entries
            .get_mut(&user)
            .and_then(|datasets| datasets.get_mut(dataset));
        if entry.is_none() {
            tracing::warn!("{op} on dataset '{dataset}' for user {user} before preload; ignoring");
        }
        entry
    }
}

impl std::fmt::Debug for UserStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let resident: usize = self.entries.values().map(HashMap::len).sum();
        f.debug_struct("UserStore")
            .field("data_dir", &self.data_dir)
            .field("active_user", &self.active_user)
            .field("resident_entries", &resident)
            .finish()
    }
}

fn is_valid_dataset_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
}
