//! The process-wide commit coordinator.
//!
//! One `CommitCoordinator` spans every database handle in the process. It
//! owns the cluster-level state: the recursive commit lock, the commit
//! counter, the committed-hash mirror, the in-flight registry of prepared
//! transactions, and the set of ids that have committed but not yet been
//! drained to peers. Construct it once at process init and hand an `Arc`
//! to each handle; there is deliberately no hidden global.
//!
//! The in-flight registry and the committed-id set carry no ordering
//! guarantees of their own: callers mutate them only while holding the
//! commit lock. The inner mutexes exist solely to make the shared
//! structures safe to touch at all.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::lock_api::ArcReentrantMutexGuard;
use parking_lot::{Mutex, RawMutex, RawThreadId, ReentrantMutex};
use tracing::debug;

use quorumlite_types::{CommitId, JournalEntry};

/// Owned, scoped hold on the commit lock.
///
/// Dropping the guard releases the lock on every exit path, panics
/// included. Re-acquisition by the holding thread is legal and refcounted,
/// so a collaborator can bracket several handle operations (drain, then
/// prepare, then commit) in one window without deadlocking the inner
/// `prepare`.
pub type CommitLockGuard = ArcReentrantMutexGuard<RawMutex, RawThreadId, ()>;

/// Process-wide commit coordination state shared by all database handles.
#[derive(Debug, Default)]
pub struct CommitCoordinator {
    /// Serializes the `prepare..commit` window; recursive so the consensus
    /// layer can hold it across several handle operations.
    commit_lock: Arc<ReentrantMutex<()>>,

    /// Highest committed id, readable without the lock.
    commit_count: AtomicU64,

    /// Hash of the state after the highest commit, mirrored here so peers
    /// and fresh handles never have to touch storage for it.
    committed_hash: Mutex<String>,

    /// Prepared transactions not yet drained to peers, keyed by commit id.
    in_flight: Mutex<BTreeMap<CommitId, JournalEntry>>,

    /// Ids that have actually committed (as opposed to merely prepared)
    /// and are waiting for the next drain.
    committed_ids: Mutex<BTreeSet<CommitId>>,
}

impl CommitCoordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the commit lock for the calling thread.
    ///
    /// Every `prepare` holds this through its matching `commit` or
    /// `rollback`; external collaborators take it around any work that
    /// must be atomic with a commit window.
    #[must_use]
    pub fn lock_commits(&self) -> CommitLockGuard {
        self.commit_lock.lock_arc()
    }

    /// Highest committed id.
    #[must_use]
    pub fn commit_count(&self) -> CommitId {
        CommitId::new(self.commit_count.load(Ordering::Acquire))
    }

    /// Hash of the state after the highest commit; empty before the first.
    #[must_use]
    pub fn committed_hash(&self) -> String {
        self.committed_hash.lock().clone()
    }

    /// Number of prepared-but-undrained transactions. Mostly useful to
    /// tests and monitoring.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Merge recovered journal state at handle open: adopt the on-disk
    /// commit head if it is ahead of what this process has seen.
    /// Call with the commit lock held.
    pub(crate) fn recover(&self, id: CommitId, hash: &str) {
        if id.get() > self.commit_count.load(Ordering::Acquire) {
            self.commit_count.store(id.get(), Ordering::Release);
            *self.committed_hash.lock() = hash.to_owned();
            debug!(id = %id, "recovered commit head from journal");
        }
    }

    /// Record a prepared transaction. Call with the commit lock held.
    pub(crate) fn register_in_flight(&self, id: CommitId, entry: JournalEntry) {
        self.in_flight.lock().insert(id, entry);
    }

    /// Remove a prepared transaction that rolled back instead of
    /// committing. Call with the commit lock held.
    pub(crate) fn forget_in_flight(&self, id: CommitId) {
        self.in_flight.lock().remove(&id);
    }

    /// Publish a successful commit: advance the counter and hash mirror
    /// and mark the id drainable. Call with the commit lock held.
    pub(crate) fn publish_commit(&self, id: CommitId, hash: String) {
        self.commit_count.store(id.get(), Ordering::Release);
        *self.committed_hash.lock() = hash;
        self.committed_ids.lock().insert(id);
    }

    /// Oldest commit id still awaiting drain; the journal must never
    /// truncate at or above this.
    pub(crate) fn oldest_in_flight(&self) -> Option<CommitId> {
        self.in_flight.lock().keys().next().copied()
    }

    /// Atomically remove and return every committed-but-undrained
    /// transaction, in ascending id order.
    ///
    /// Iterated in order, the result hands the replication layer every
    /// successful commit exactly once across the process lifetime.
    /// Transactions that were prepared and then rolled back never appear.
    #[must_use]
    pub fn drain_committed(&self) -> BTreeMap<CommitId, JournalEntry> {
        let _window = self.lock_commits();
        let ids = std::mem::take(&mut *self.committed_ids.lock());
        let mut in_flight = self.in_flight.lock();
        let mut drained = BTreeMap::new();
        for id in ids {
            if let Some(entry) = in_flight.remove(&id) {
                drained.insert(id, entry);
            }
        }
        drained
    }
}
