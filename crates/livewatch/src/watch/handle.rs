//! User-facing handle for a live folder.
//!
//! The [`LiveFolder`] provides the main interface for reading the current
//! files of a watched folder and controlling its drain thread.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;

use super::builder::{ErrorCallback, UpdateCallback};
use super::collection::LiveCollection;
use super::types::{FileEntry, FolderEvent, WatchScope};
use super::watcher::FolderWatcher;
use crate::error::Result;
use crate::path::NormalizedPath;

/// Handle for reading and controlling a live folder.
///
/// `LiveFolder` provides:
/// - Snapshots of the files currently in the folder
/// - Change detection through an epoch counter
/// - Manual rescans
/// - Graceful shutdown
///
/// The handle is cheaply cloneable. The drain thread stops when the last
/// clone is dropped.
///
/// # Example
///
/// ```
/// use livewatch::FolderWatchBuilder;
/// use livewatch::memory::{MemoryFileSystem, MemoryWatcherFactory};
///
/// let fs = MemoryFileSystem::new();
/// fs.write_file("/inbox/a.txt");
///
/// let folder = FolderWatchBuilder::new("/inbox")
///     .file_system(fs.clone())
///     .watcher_factory(MemoryWatcherFactory::new())
///     .build()
///     .unwrap();
///
/// assert_eq!(folder.len(), 1);
/// folder.stop();
/// assert!(!folder.is_running());
/// ```
#[derive(Clone)]
pub struct LiveFolder {
    /// The watcher owning the drain thread.
    watcher: Arc<FolderWatcher>,

    /// Handle to the callback processor thread.
    callback_thread: Option<Arc<JoinHandle<()>>>,
}

impl LiveFolder {
    pub(crate) fn new(
        watcher: FolderWatcher,
        on_update: Option<UpdateCallback>,
        on_error: Option<ErrorCallback>,
    ) -> Self {
        let watcher = Arc::new(watcher);

        // The callback thread holds only the receiver, so dropping the last
        // handle still stops the drain thread.
        let callback_thread = if on_update.is_some() || on_error.is_some() {
            let event_rx = watcher.event_receiver().clone();

            let handle = thread::Builder::new()
                .name("livewatch-callbacks".to_string())
                .spawn(move || {
                    callback_loop(&event_rx, on_update.as_ref(), on_error.as_ref());
                })
                .map_err(|e| tracing::warn!(error = %e, "failed to spawn callback thread"))
                .ok();

            handle.map(Arc::new)
        } else {
            None
        };

        Self {
            watcher,
            callback_thread,
        }
    }

    /// Get the current files.
    ///
    /// The snapshot stays valid, and unchanged, after later updates.
    #[must_use]
    pub fn snapshot(&self) -> Arc<LiveCollection> {
        self.watcher.collection().snapshot()
    }

    /// Owned copy of the current entries, in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<FileEntry> {
        self.read(|c| c.entries().cloned().collect())
    }

    /// Owned copy of the current paths, in insertion order.
    #[must_use]
    pub fn paths(&self) -> Vec<NormalizedPath> {
        self.read(LiveCollection::paths)
    }

    /// Read the current files via a closure.
    ///
    /// ```ignore
    /// let has_lock = folder.read(|c| c.keys().any(|k| k.as_str().ends_with(".lock")));
    /// ```
    pub fn read<R, F>(&self, f: F) -> R
    where
        F: FnOnce(&LiveCollection) -> R,
    {
        self.watcher.collection().read(f)
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read(LiveCollection::len)
    }

    /// Returns `true` if the folder holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read(LiveCollection::is_empty)
    }

    /// Returns `true` if the file is present.
    #[must_use]
    pub fn contains(&self, path: impl Into<NormalizedPath>) -> bool {
        let path = path.into();
        self.read(|c| c.contains(&path))
    }

    /// Get the current epoch.
    ///
    /// The epoch increments with every applied change. The initial scan does
    /// not count.
    #[must_use]
    pub fn epoch(&self) -> u64 {
        self.watcher.collection().epoch()
    }

    /// Check if the files have changed since a given epoch.
    #[must_use]
    pub fn has_changed_since(&self, epoch: u64) -> bool {
        self.epoch() != epoch
    }

    /// Block until the epoch differs from `epoch`, or `timeout` elapses.
    ///
    /// Returns `true` if a change was observed.
    pub fn wait_for_change(&self, epoch: u64, timeout: Duration) -> bool {
        self.watcher.collection().wait_for_change(epoch, timeout)
    }

    /// The scope being watched, with its root resolved by the file system.
    #[must_use]
    pub fn scope(&self) -> &WatchScope {
        self.watcher.scope()
    }

    /// Re-enumerate the folder and reconcile the collection with it.
    ///
    /// The rescan runs on the drain thread, after any notification already
    /// received. Use it after a period where notifications may have been
    /// lost.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Stopped`](crate::Error::Stopped) if the folder has
    /// been stopped or has faulted, or [`Error::Channel`](crate::Error::Channel)
    /// if communication with the drain thread failed.
    pub fn rescan(&self) -> Result<()> {
        self.watcher.request_rescan()
    }

    /// Stop watching.
    ///
    /// The last snapshot remains readable.
    pub fn stop(&self) {
        self.watcher.stop();
    }

    /// Check if the drain thread is still running.
    ///
    /// Returns `false` after `stop()` or after a watcher fault.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.watcher.is_running()
    }

    /// Events published by the drain thread.
    ///
    /// The channel is bounded. Updates are dropped while it is full; an error
    /// event instead evicts the oldest queued event, so it always arrives. When
    /// `on_update` or `on_error` callbacks are registered, the callback
    /// thread consumes from this same channel, so use one or the other.
    #[must_use]
    pub fn events(&self) -> &Receiver<FolderEvent> {
        self.watcher.event_receiver()
    }
}

impl std::fmt::Debug for LiveFolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveFolder")
            .field("root", &self.scope().root)
            .field("epoch", &self.epoch())
            .field("running", &self.is_running())
            .field("callbacks", &self.callback_thread.is_some())
            .finish()
    }
}

/// Callback processing loop. Ends once the drain thread is gone.
fn callback_loop(
    event_rx: &Receiver<FolderEvent>,
    on_update: Option<&UpdateCallback>,
    on_error: Option<&ErrorCallback>,
) {
    for event in event_rx {
        match event {
            FolderEvent::Updated(update) => {
                if let Some(cb) = on_update {
                    cb(update);
                }
            }
            FolderEvent::RescanFailed(err) | FolderEvent::Faulted(err) => {
                if let Some(cb) = on_error {
                    cb(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FolderWatchBuilder;
    use crate::memory::{MemoryFileSystem, MemoryWatcherFactory};

    #[test]
    fn test_handle_debug() {
        let fs = MemoryFileSystem::new();
        fs.create_dir("/d");
        let folder = FolderWatchBuilder::new("/d")
            .file_system(fs)
            .watcher_factory(MemoryWatcherFactory::new())
            .build()
            .unwrap();

        let debug = format!("{folder:?}");
        assert!(debug.contains("LiveFolder"));
        assert!(debug.contains("running: true"));
    }

    #[test]
    fn test_last_clone_stops_drain_thread() {
        let fs = MemoryFileSystem::new();
        let watcher = MemoryWatcherFactory::new();
        fs.create_dir("/d");

        let folder = FolderWatchBuilder::new("/d")
            .file_system(fs)
            .watcher_factory(watcher.clone())
            .on_update(|_| {})
            .build()
            .unwrap();
        let clone = folder.clone();

        drop(folder);
        assert_eq!(watcher.subscriptions(), 1);
        drop(clone);
        assert_eq!(watcher.subscriptions(), 0);
    }
}
