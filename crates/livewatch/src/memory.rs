//! In-memory filesystem and watcher.
//!
//! [`MemoryFileSystem`] and [`MemoryWatcherFactory`] stand in for the real
//! filesystem and OS watcher. They are deterministic: writing a file does
//! not produce a notification until [`MemoryWatcherFactory::mark_created`]
//! is called, and notifications are delivered synchronously into every live
//! subscription.
//!
//! ```
//! use livewatch::memory::{MemoryFileSystem, MemoryWatcherFactory};
//! use livewatch::WatchContext;
//!
//! let fs = MemoryFileSystem::new();
//! let watcher = MemoryWatcherFactory::new();
//! fs.create_dir("/inbox");
//!
//! let ctx = WatchContext::new(fs.clone(), watcher.clone());
//! let _contents = ctx.watch_folder_contents("/inbox").unwrap();
//! assert_eq!(watcher.subscriptions(), 1);
//! ```

use std::collections::HashSet;
use std::io;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::{Mutex, RwLock};

use crate::error::{Error, Result};
use crate::fs::FileSystem;
use crate::path::NormalizedPath;
use crate::watch::{ChangeNotification, NotificationSink, WatchScope, WatcherFactory, WatcherHandle};

#[derive(Debug, Default)]
struct Tree {
    // Creation order is the enumeration order.
    files: IndexSet<NormalizedPath>,
    dirs: HashSet<NormalizedPath>,
}

impl Tree {
    fn add_dir_all(&mut self, dir: &NormalizedPath) {
        let mut current = Some(dir.clone());
        while let Some(dir) = current {
            current = dir.parent();
            if !self.dirs.insert(dir) {
                break;
            }
        }
    }
}

/// Filesystem held entirely in memory.
///
/// Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    tree: Arc<RwLock<Tree>>,
}

impl MemoryFileSystem {
    /// Create an empty filesystem.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a directory and all of its ancestors.
    pub fn create_dir(&self, path: impl Into<NormalizedPath>) {
        self.tree.write().add_dir_all(&path.into());
    }

    /// Create a file (and its parent directories). Writing an existing file
    /// keeps its enumeration position.
    pub fn write_file(&self, path: impl Into<NormalizedPath>) {
        let path = path.into();
        let mut tree = self.tree.write();
        if let Some(parent) = path.parent() {
            tree.add_dir_all(&parent);
        }
        tree.files.insert(path);
    }

    /// Delete a file. Returns `false` if it did not exist.
    pub fn remove_file(&self, path: impl Into<NormalizedPath>) -> bool {
        self.tree.write().files.shift_remove(&path.into())
    }

    /// Every file, in creation order.
    #[must_use]
    pub fn files(&self) -> Vec<NormalizedPath> {
        self.tree.read().files.iter().cloned().collect()
    }
}

impl FileSystem for MemoryFileSystem {
    fn list_files(&self, dir: &NormalizedPath, recursive: bool) -> io::Result<Vec<NormalizedPath>> {
        let tree = self.tree.read();
        if !tree.dirs.contains(dir) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {dir}"),
            ));
        }

        Ok(tree
            .files
            .iter()
            .filter(|f| {
                if recursive {
                    f.is_descendant_of(dir)
                } else {
                    f.is_child_of(dir)
                }
            })
            .cloned()
            .collect())
    }
}

#[derive(Debug, Default)]
struct Registry {
    next_id: u64,
    subscriptions: Vec<(u64, WatchScope, NotificationSink)>,
}

/// Watcher driven by explicit calls instead of the OS.
///
/// Like a watcher without kernel-side filtering, every notification is
/// delivered to every live subscription regardless of its scope. Clones
/// share the same subscriptions.
#[derive(Debug, Clone, Default)]
pub struct MemoryWatcherFactory {
    registry: Arc<Mutex<Registry>>,
}

impl MemoryWatcherFactory {
    /// Create a watcher with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report that `path` was created. Returns how many subscriptions
    /// received it.
    pub fn mark_created(&self, path: impl Into<NormalizedPath>) -> usize {
        self.broadcast(&ChangeNotification::created(path))
    }

    /// Report that `path` was deleted. Returns how many subscriptions
    /// received it.
    pub fn mark_deleted(&self, path: impl Into<NormalizedPath>) -> usize {
        self.broadcast(&ChangeNotification::deleted(path))
    }

    /// Fail every live subscription with a watcher fault.
    pub fn fail(&self, message: &str) -> usize {
        let mut registry = self.registry.lock();
        registry.subscriptions.retain(|(_, _, sink)| !sink.is_closed());
        registry
            .subscriptions
            .iter()
            .filter(|(_, _, sink)| sink.fault(Error::watcher_fault(message, None)))
            .count()
    }

    /// Number of live subscriptions.
    #[must_use]
    pub fn subscriptions(&self) -> usize {
        let mut registry = self.registry.lock();
        registry.subscriptions.retain(|(_, _, sink)| !sink.is_closed());
        registry.subscriptions.len()
    }

    /// Scopes of the live subscriptions, oldest first.
    #[must_use]
    pub fn scopes(&self) -> Vec<WatchScope> {
        let registry = self.registry.lock();
        registry
            .subscriptions
            .iter()
            .filter(|(_, _, sink)| !sink.is_closed())
            .map(|(_, scope, _)| scope.clone())
            .collect()
    }

    fn broadcast(&self, notification: &ChangeNotification) -> usize {
        let mut registry = self.registry.lock();
        registry.subscriptions.retain(|(_, _, sink)| !sink.is_closed());
        registry
            .subscriptions
            .iter()
            .filter(|(_, _, sink)| sink.send(notification.clone()))
            .count()
    }
}

/// Removes a subscription from the registry when its handle is dropped.
struct Registration {
    id: u64,
    registry: Arc<Mutex<Registry>>,
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.registry
            .lock()
            .subscriptions
            .retain(|(id, _, _)| *id != self.id);
    }
}

impl WatcherFactory for MemoryWatcherFactory {
    fn watch(&self, scope: &WatchScope, sink: NotificationSink) -> Result<WatcherHandle> {
        let mut registry = self.registry.lock();
        registry.next_id += 1;
        let id = registry.next_id;
        registry.subscriptions.push((id, scope.clone(), sink));
        tracing::trace!(id, root = %scope.root, "memory.watch");

        Ok(WatcherHandle::new(Registration {
            id,
            registry: Arc::clone(&self.registry),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_fs_lists_in_creation_order() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/d/b");
        fs.write_file("/d/a");
        fs.write_file("/d/sub/c");

        let dir = NormalizedPath::new("/d");
        assert_eq!(
            fs.list_files(&dir, false).unwrap(),
            vec![NormalizedPath::new("/d/b"), NormalizedPath::new("/d/a")]
        );
        assert_eq!(fs.list_files(&dir, true).unwrap().len(), 3);
        assert_eq!(fs.resolve(&dir), dir);
    }

    #[test]
    fn test_memory_fs_missing_dir() {
        let fs = MemoryFileSystem::new();
        let err = fs.list_files(&NormalizedPath::new("/nope"), false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_fs_remove_keeps_order() {
        let fs = MemoryFileSystem::new();
        fs.write_file("/d/a");
        fs.write_file("/d/b");
        fs.write_file("/d/c");
        assert!(fs.remove_file("/d/b"));
        assert!(!fs.remove_file("/d/b"));
        assert_eq!(
            fs.files(),
            vec![NormalizedPath::new("/d/a"), NormalizedPath::new("/d/c")]
        );
    }

    #[test]
    fn test_dropping_handle_unregisters() {
        let watcher = MemoryWatcherFactory::new();
        let (tx, _rx) = futures::channel::mpsc::unbounded();
        let handle = watcher
            .watch(&WatchScope::direct("/d"), NotificationSink::new(tx))
            .unwrap();
        assert_eq!(watcher.subscriptions(), 1);
        assert_eq!(watcher.mark_created("/d/a"), 1);

        drop(handle);
        assert_eq!(watcher.subscriptions(), 0);
        assert_eq!(watcher.mark_created("/d/a"), 0);
    }
}
