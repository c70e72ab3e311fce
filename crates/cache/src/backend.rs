//! The persistence collaborator contract consumed by the cache
//!
//! A backend either finishes a save as part of the call itself (the queued
//! engine only enqueues, so from the caller's point of view the call is
//! complete) or hands back a ticket that settles when the write actually
//! lands. The cache branches on that distinction explicitly instead of
//! probing handle state.

use parking_lot::{Condvar, Mutex};
use saveback_core::{DatasetMap, UserId};
use std::sync::Arc;

/// Terminal state of a save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Succeeded,
    Failed,
}

/// Result of handing a snapshot to a backend
pub enum SaveOutcome {
    /// The call itself completed the hand-off; nothing to track
    CompletedSynchronously,
    /// The write is still pending; the ticket settles when it finishes
    SubmittedAsync(SaveTicket),
}

/// Storage collaborator for the write-back cache.
///
/// Load never fails visibly: any problem yields a fresh default map and a
/// log record. Save failures are absorbed the same way; the cache re-arms
/// the dirty flag through the ticket when one is returned.
pub trait PersistenceBackend: Send + Sync {
    /// Load the dataset map for `<dir>/<user>/<file>`, or a default
    fn load(&self, user: UserId, dir: &str, file: &str) -> DatasetMap;

    /// Persist a finalized snapshot for `<dir>/<user>/<file>`
    fn save(&self, user: UserId, dir: &str, file: &str, snapshot: DatasetMap) -> SaveOutcome;

    /// Block until every accepted save has been processed
    fn flush(&self);
}

/// A settle-once completion cell for a pending save.
///
/// The backend settles it exactly once; waiters block on [`wait`] and
/// completion handlers attached with [`on_settle`] run on the settling
/// thread (or inline, if the ticket already settled).
#[derive(Clone)]
pub struct SaveTicket {
    shared: Arc<TicketShared>,
}

struct TicketShared {
    state: Mutex<TicketState>,
    settled: Condvar,
}

struct TicketState {
    status: Option<SaveStatus>,
    /// True once the settling thread has finished running attached
    /// callbacks; waiters are released only then, so completion handling is
    /// always observable after [`SaveTicket::wait`] returns.
    done: bool,
    callbacks: Vec<Box<dyn FnOnce(SaveStatus) + Send>>,
}

impl SaveTicket {
    /// Create an unsettled ticket
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TicketShared {
                state: Mutex::new(TicketState {
                    status: None,
                    done: false,
                    callbacks: Vec::new(),
                }),
                settled: Condvar::new(),
            }),
        }
    }

    /// Settle the ticket. A second settle is ignored.
    pub fn settle(&self, status: SaveStatus) {
        let callbacks = {
            let mut state = self.shared.state.lock();
            if state.status.is_some() {
                return;
            }
            state.status = Some(status);
            std::mem::take(&mut state.callbacks)
        };
        for callback in callbacks {
            callback(status);
        }
        self.shared.state.lock().done = true;
        self.shared.settled.notify_all();
    }

    /// Run `callback` when the ticket settles; immediately if it already has
    pub fn on_settle(&self, callback: impl FnOnce(SaveStatus) + Send + 'static) {
        let already = {
            let mut state = self.shared.state.lock();
            match state.status {
                Some(status) => Some(status),
                None => {
                    state.callbacks.push(Box::new(callback));
                    return;
                }
            }
        };
        if let Some(status) = already {
            callback(status);
        }
    }

    /// Block the calling thread until the ticket settles and its completion
    /// handlers have run
    pub fn wait(&self) -> SaveStatus {
        let mut state = self.shared.state.lock();
        loop {
            if state.done {
                if let Some(status) = state.status {
                    return status;
                }
            }
            self.shared.settled.wait(&mut state);
        }
    }

    /// The status, if the ticket has settled
    pub fn status(&self) -> Option<SaveStatus> {
        self.shared.state.lock().status
    }
}

impl Default for SaveTicket {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SaveTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveTicket")
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    #[test]
    fn test_wait_blocks_until_settled() {
        let ticket = SaveTicket::new();
        let settler = ticket.clone();

        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            settler.settle(SaveStatus::Succeeded);
        });

        assert_eq!(ticket.wait(), SaveStatus::Succeeded);
        handle.join().unwrap();
    }

    #[test]
    fn test_on_settle_runs_on_settling_thread() {
        let ticket = SaveTicket::new();
        let ran = Arc::new(AtomicU32::new(0));
        let ran_clone = Arc::clone(&ran);
        ticket.on_settle(move |status| {
            assert_eq!(status, SaveStatus::Failed);
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(ran.load(Ordering::SeqCst), 0);
        ticket.settle(SaveStatus::Failed);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_on_settle_after_settle_runs_inline() {
        let ticket = SaveTicket::new();
        ticket.settle(SaveStatus::Succeeded);

        let ran = Arc::new(AtomicU32::new(0));
        let ran_clone = Arc::clone(&ran);
        ticket.on_settle(move |_| {
            ran_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_second_settle_is_ignored() {
        let ticket = SaveTicket::new();
        ticket.settle(SaveStatus::Succeeded);
        ticket.settle(SaveStatus::Failed);
        assert_eq!(ticket.status(), Some(SaveStatus::Succeeded));
    }
}
