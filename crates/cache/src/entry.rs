//! In-memory cache entries and their versioned save state
//!
//! The dataset map itself is single-owner: only the thread owning the store
//! mutates it. The version counter and the dirty/saving flags live in a
//! shared [`EntryState`] so a completion handler running on a backend thread
//! can reconcile them after a save settles.

use crate::backend::SaveStatus;
use saveback_core::{DatasetMap, Value};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Version counter and dirty/saving flags for one (user, dataset) entry.
///
/// `version` increases by exactly one on every state-changing mutation;
/// no-op mutations leave it unchanged. `dirty` is true iff mutations exist
/// that have not been captured by a snapshot whose save completed
/// successfully.
pub struct EntryState {
    version: AtomicU64,
    dirty: AtomicBool,
    saving: AtomicBool,
}

impl EntryState {
    fn new() -> Self {
        Self {
            version: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            saving: AtomicBool::new(false),
        }
    }

    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn is_saving(&self) -> bool {
        self.saving.load(Ordering::SeqCst)
    }

    /// Record one state-changing mutation
    fn mark_mutated(&self) {
        self.version.fetch_add(1, Ordering::SeqCst);
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Start a save: optimistically clear dirty and return the version the
    /// snapshot was captured at.
    pub(crate) fn begin_save(&self) -> u64 {
        self.dirty.store(false, Ordering::SeqCst);
        self.version.load(Ordering::SeqCst)
    }

    /// Mark that a pending save is being tracked
    pub(crate) fn mark_saving(&self) {
        self.saving.store(true, Ordering::SeqCst);
    }

    /// Reconcile after a pending save settles.
    ///
    /// On success, mutations that raced the save window (version moved past
    /// `snapshot_version`) re-arm dirty; a clean window leaves dirty as the
    /// optimistic clear set it. On failure dirty is re-armed unconditionally
    /// so a later save retries. Either way the entry is no longer saving.
    pub(crate) fn settle_save(&self, snapshot_version: u64, status: SaveStatus) {
        match status {
            SaveStatus::Succeeded => {
                if self.version.load(Ordering::SeqCst) != snapshot_version {
                    self.dirty.store(true, Ordering::SeqCst);
                }
            }
            SaveStatus::Failed => {
                self.dirty.store(true, Ordering::SeqCst);
            }
        }
        self.saving.store(false, Ordering::SeqCst);
    }
}

/// One resident (user, dataset) pair: the live mapping plus its save state
pub(crate) struct CacheEntry {
    values: DatasetMap,
    state: Arc<EntryState>,
}

impl CacheEntry {
    /// Install an entry from loaded (or empty) data: version 0, clean
    pub(crate) fn new(values: DatasetMap) -> Self {
        Self {
            values,
            state: Arc::new(EntryState::new()),
        }
    }

    pub(crate) fn state(&self) -> &Arc<EntryState> {
        &self.state
    }

    pub(crate) fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub(crate) fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Shallow snapshot of the mapping for the persistence layer
    pub(crate) fn snapshot(&self) -> DatasetMap {
        self.values.clone()
    }

    /// Store `value` under `key`; bumps the version only if this changes
    /// the stored state.
    pub(crate) fn set(&mut self, key: &str, value: Value) {
        if self.values.get(key) == Some(&value) {
            return;
        }
        self.values.insert(key.to_string(), value);
        self.state.mark_mutated();
    }

    /// Remove `key`; deleting an absent key is a no-op
    pub(crate) fn delete_key(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.state.mark_mutated();
        }
    }

    /// Empty the mapping; clearing an empty map is a no-op
    pub(crate) fn clear(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.state.mark_mutated();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_bumps_only_on_state_changes() {
        let mut entry = CacheEntry::new(DatasetMap::new());
        assert_eq!(entry.state().version(), 0);
        assert!(!entry.state().is_dirty());

        entry.set("gold", Value::Int(100));
        assert_eq!(entry.state().version(), 1);
        assert!(entry.state().is_dirty());

        // Same value again: no state change, no bump
        entry.set("gold", Value::Int(100));
        assert_eq!(entry.state().version(), 1);

        entry.set("gold", Value::Int(150));
        assert_eq!(entry.state().version(), 2);

        entry.delete_key("absent");
        assert_eq!(entry.state().version(), 2);

        entry.delete_key("gold");
        assert_eq!(entry.state().version(), 3);

        entry.clear();
        assert_eq!(entry.state().version(), 3);

        entry.set("gold", Value::Int(1));
        entry.clear();
        assert_eq!(entry.state().version(), 5);
    }

    #[test]
    fn test_settle_success_with_untouched_version_stays_clean() {
        let mut entry = CacheEntry::new(DatasetMap::new());
        entry.set("gold", Value::Int(100));

        let snapshot_version = entry.state().begin_save();
        assert!(!entry.state().is_dirty());
        entry.state().mark_saving();

        entry
            .state()
            .settle_save(snapshot_version, SaveStatus::Succeeded);
        assert!(!entry.state().is_dirty());
        assert!(!entry.state().is_saving());
    }

    #[test]
    fn test_settle_success_after_racing_mutation_rearms_dirty() {
        let mut entry = CacheEntry::new(DatasetMap::new());
        entry.set("gold", Value::Int(100));

        let snapshot_version = entry.state().begin_save();
        entry.state().mark_saving();

        // Mutation lands while the save is in flight
        entry.set("gold", Value::Int(150));

        entry
            .state()
            .settle_save(snapshot_version, SaveStatus::Succeeded);
        assert!(entry.state().is_dirty());
        assert!(!entry.state().is_saving());
    }

    #[test]
    fn test_settle_failure_rearms_dirty_unconditionally() {
        let mut entry = CacheEntry::new(DatasetMap::new());
        entry.set("gold", Value::Int(100));

        let snapshot_version = entry.state().begin_save();
        entry.state().mark_saving();

        entry
            .state()
            .settle_save(snapshot_version, SaveStatus::Failed);
        assert!(entry.state().is_dirty());
        assert!(!entry.state().is_saving());
    }

    #[test]
    fn test_snapshot_is_decoupled_from_live_map() {
        let mut entry = CacheEntry::new(DatasetMap::new());
        entry.set("gold", Value::Int(100));

        let snapshot = entry.snapshot();
        entry.set("gold", Value::Int(150));

        assert_eq!(snapshot.get("gold"), Some(&Value::Int(100)));
        assert_eq!(entry.get("gold"), Some(&Value::Int(150)));
    }
}
