//! Thread-safe live collection container.
//!
//! This module provides [`SharedCollection`], the container a
//! [`LiveFolder`](super::LiveFolder) keeps its files in. One writer applies
//! updates; any number of readers take snapshots.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};

use super::collection::LiveCollection;
use super::types::CollectionUpdate;

/// Thread-safe container for a live collection.
///
/// # Thread Safety
///
/// - Readers never see a half-applied update
/// - Snapshots are immutable and stay valid after later updates
/// - The epoch counter allows cheap change detection
///
/// # Example
///
/// ```
/// use livewatch::{LiveCollection, SharedCollection};
///
/// let shared = SharedCollection::new(LiveCollection::new());
/// let epoch = shared.epoch();
/// let snapshot = shared.snapshot();
/// assert!(snapshot.is_empty());
/// assert_eq!(shared.epoch(), epoch);
/// ```
pub struct SharedCollection {
    /// Current contents; copied on write if a snapshot is still held.
    inner: RwLock<Arc<LiveCollection>>,

    /// Incremented on each applied change.
    epoch: AtomicU64,

    /// Paired with `changed` so waiters cannot miss a bump.
    wait_lock: Mutex<()>,
    changed: Condvar,
}

impl SharedCollection {
    /// Create a container holding `initial`. The epoch starts at 0.
    #[must_use]
    pub fn new(initial: LiveCollection) -> Self {
        Self {
            inner: RwLock::new(Arc::new(initial)),
            epoch: AtomicU64::new(0),
            wait_lock: Mutex::new(()),
            changed: Condvar::new(),
        }
    }

    /// Get the current contents.
    ///
    /// Multiple calls return the same `Arc` until the next change.
    #[must_use]
    pub fn snapshot(&self) -> Arc<LiveCollection> {
        self.inner.read().clone()
    }

    /// Read the current contents via a closure, without cloning the `Arc`.
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&LiveCollection) -> R,
    {
        let guard = self.inner.read();
        f(&**guard)
    }

    /// Get the current epoch.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Block until the epoch differs from `since`, or `timeout` elapses.
    ///
    /// Returns `true` if a change was observed.
    pub fn wait_for_change(&self, since: u64, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut guard = self.wait_lock.lock();
        while self.epoch() == since {
            if self.changed.wait_until(&mut guard, deadline).timed_out() {
                return self.epoch() != since;
            }
        }
        true
    }

    /// Apply one update. Returns `true` if the contents changed, in which
    /// case the epoch is bumped and waiters are woken.
    pub(crate) fn apply(&self, update: &CollectionUpdate) -> bool {
        let changed = {
            let mut guard = self.inner.write();
            if guard.get(update.key()).is_none() && !update.is_add() {
                false
            } else {
                Arc::make_mut(&mut *guard).apply(update)
            }
        };

        if changed {
            self.epoch.fetch_add(1, Ordering::Release);
            let _guard = self.wait_lock.lock();
            self.changed.notify_all();
        }
        changed
    }
}

impl Default for SharedCollection {
    fn default() -> Self {
        Self::new(LiveCollection::new())
    }
}

impl std::fmt::Debug for SharedCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCollection")
            .field("epoch", &self.epoch())
            .field("len", &self.read(LiveCollection::len))
            .finish()
    }
}
