//! Atomic file persistence engine
//!
//! Converts a save request into a crash-safe on-disk replacement and absorbs
//! every storage failure at this layer: a failed load yields a fresh default
//! map, a failed save leaves the previous file untouched, and in both cases
//! the only visible effect is a log record.

use crate::backend::{PersistenceBackend, SaveOutcome};
use crate::queue::{SaveQueue, SaveRequest};
use crate::serialization::Serializer;
use saveback_core::{DatasetMap, Result, UserId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Durable storage for (user, dataset) blobs, backed by the save queue.
///
/// On-disk layout: `<root>/<dir>/<user>/<file><extension>`, where the
/// extension comes from the serializer in use.
pub struct PersistenceEngine {
    root: PathBuf,
    serializer: Arc<dyn Serializer>,
    queue: SaveQueue,
}

impl PersistenceEngine {
    /// Create an engine rooted at `root`, with its worker running
    pub fn new(root: PathBuf, serializer: Arc<dyn Serializer>) -> Self {
        let writer = SnapshotWriter {
            root: root.clone(),
            serializer: Arc::clone(&serializer),
        };
        let queue = SaveQueue::new(Box::new(move |request| writer.write(request)));

        Self {
            root,
            serializer,
            queue,
        }
    }

    /// The absolute path a dataset file lives at
    pub fn dataset_path(&self, user: UserId, dir: &str, file: &str) -> PathBuf {
        dataset_path(&self.root, self.serializer.extension(), user, dir, file)
    }

    /// Number of saves still waiting in the queue
    pub fn pending_saves(&self) -> usize {
        self.queue.pending_len()
    }

    /// True when the queue holds no request and the worker is parked
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }
}

impl PersistenceBackend for PersistenceEngine {
    fn load(&self, user: UserId, dir: &str, file: &str) -> DatasetMap {
        let path = self.dataset_path(user, dir, file);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no dataset file at '{}', starting empty", path.display());
                return DatasetMap::default();
            }
            Err(e) => {
                tracing::warn!(
                    "failed to read dataset file '{}', starting empty: {e}",
                    path.display()
                );
                return DatasetMap::default();
            }
        };

        match self.serializer.from_bytes(&bytes) {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(
                    "failed to decode dataset file '{}', starting empty: {e}",
                    path.display()
                );
                DatasetMap::default()
            }
        }
    }

    fn save(&self, user: UserId, dir: &str, file: &str, snapshot: DatasetMap) -> SaveOutcome {
        self.queue.enqueue(SaveRequest {
            user,
            dir: dir.to_string(),
            file: file.to_string(),
            snapshot,
        });
        // The hand-off is the whole call; the queue owns the write from here
        SaveOutcome::CompletedSynchronously
    }

    fn flush(&self) {
        self.queue.flush();
    }
}

/// The worker-side half of the engine: serializes a snapshot and swaps it
/// into place through the temp-sibling replacement in `saveback-utils`.
struct SnapshotWriter {
    root: PathBuf,
    serializer: Arc<dyn Serializer>,
}

impl SnapshotWriter {
    fn write(&self, request: &SaveRequest) -> Result<()> {
        let path = dataset_path(
            &self.root,
            self.serializer.extension(),
            request.user,
            &request.dir,
            &request.file,
        );
        let bytes = self.serializer.to_bytes(&request.snapshot)?;
        saveback_utils::replace_file(&path, &bytes)
    }
}

fn dataset_path(root: &Path, extension: &str, user: UserId, dir: &str, file: &str) -> PathBuf {
    root.join(dir)
        .join(user.to_string())
        .join(format!("{file}{extension}"))
}
