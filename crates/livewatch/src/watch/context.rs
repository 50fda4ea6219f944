//! The pair of capabilities every watch operation needs.

use std::fmt;
use std::sync::Arc;

use super::backend::{NotifyWatcherFactory, WatcherFactory};
use super::file::{self, FileSignals};
use super::folder::{self, FolderContents};
use super::source::{self, ChangeStream};
use super::types::WatchScope;
use crate::error::Result;
use crate::fs::{FileSystem, OsFileSystem};
use crate::path::NormalizedPath;

/// A filesystem and a watcher factory, shared by every subscription made
/// through it.
///
/// The default context uses the real filesystem and `notify`. Tests build
/// one from [`MemoryFileSystem`](crate::memory::MemoryFileSystem) and
/// [`MemoryWatcherFactory`](crate::memory::MemoryWatcherFactory).
#[derive(Clone)]
pub struct WatchContext {
    fs: Arc<dyn FileSystem>,
    watcher: Arc<dyn WatcherFactory>,
}

impl Default for WatchContext {
    fn default() -> Self {
        Self::new(OsFileSystem, NotifyWatcherFactory)
    }
}

impl WatchContext {
    /// Create a context from owned capabilities.
    pub fn new(fs: impl FileSystem + 'static, watcher: impl WatcherFactory + 'static) -> Self {
        Self {
            fs: Arc::new(fs),
            watcher: Arc::new(watcher),
        }
    }

    /// Create a context from already shared capabilities.
    #[must_use]
    pub fn from_shared(fs: Arc<dyn FileSystem>, watcher: Arc<dyn WatcherFactory>) -> Self {
        Self { fs, watcher }
    }

    /// The filesystem used for scans.
    #[must_use]
    pub fn file_system(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// The factory used for subscriptions.
    #[must_use]
    pub fn watcher_factory(&self) -> &Arc<dyn WatcherFactory> {
        &self.watcher
    }

    /// Raw notifications for the direct children of `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created.
    pub fn watch(&self, root: impl Into<NormalizedPath>) -> Result<ChangeStream> {
        self.watch_scope(WatchScope::direct(root))
    }

    /// Raw notifications for `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the watcher cannot be created.
    pub fn watch_scope(&self, scope: WatchScope) -> Result<ChangeStream> {
        source::subscribe(self.watcher.as_ref(), self.resolve_scope(scope))
    }

    /// `scope` with its root in the form the watcher reports paths in.
    #[must_use]
    pub fn resolve_scope(&self, scope: WatchScope) -> WatchScope {
        let root = self.fs.resolve(&scope.root);
        if root != scope.root {
            tracing::trace!(from = %scope.root, to = %root, "context.resolved_root");
        }
        WatchScope { root, ..scope }
    }

    /// Signal each creation of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WatchPath`](crate::Error::WatchPath) if `path` has no
    /// parent directory, or an error if the watcher cannot be created.
    pub fn watch_file(&self, path: impl Into<NormalizedPath>) -> Result<FileSignals> {
        let target = path.into();
        // The file itself may not exist yet; only its directory is resolved.
        let target = match (target.parent(), target.file_name()) {
            (Some(dir), Some(name)) => self.fs.resolve(&dir).join(name),
            _ => target,
        };
        file::subscribe(self.watcher.as_ref(), target)
    }

    /// The files directly inside `root`, kept live.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`](crate::Error::Scan) if an existing `root`
    /// cannot be listed, or an error if the watcher cannot be created.
    pub fn watch_folder_contents(&self, root: impl Into<NormalizedPath>) -> Result<FolderContents> {
        self.watch_folder_contents_in(WatchScope::direct(root))
    }

    /// The files inside `scope`, kept live.
    ///
    /// # Errors
    ///
    /// Same as [`watch_folder_contents`](Self::watch_folder_contents).
    pub fn watch_folder_contents_in(&self, scope: WatchScope) -> Result<FolderContents> {
        let scope = self.resolve_scope(scope);
        folder::subscribe(self.fs.as_ref(), self.watcher.as_ref(), scope)
    }
}

impl fmt::Debug for WatchContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchContext").finish_non_exhaustive()
    }
}

/// [`WatchContext::watch_file`] on the default context.
///
/// # Errors
///
/// See [`WatchContext::watch_file`].
pub fn watch_file(path: impl Into<NormalizedPath>) -> Result<FileSignals> {
    WatchContext::default().watch_file(path)
}

/// [`WatchContext::watch_folder_contents`] on the default context.
///
/// # Errors
///
/// See [`WatchContext::watch_folder_contents`].
pub fn watch_folder_contents(root: impl Into<NormalizedPath>) -> Result<FolderContents> {
    WatchContext::default().watch_folder_contents(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryFileSystem, MemoryWatcherFactory};

    #[test]
    fn test_context_routes_to_capabilities() {
        let fs = MemoryFileSystem::new();
        let watcher = MemoryWatcherFactory::new();
        fs.write_file("/d/a");
        let ctx = WatchContext::new(fs, watcher.clone());

        let contents = ctx.watch_folder_contents("/d").unwrap();
        assert_eq!(contents.pending_initial(), 1);
        let _signals = ctx.watch_file("/d/b").unwrap();
        let _raw = ctx.watch_scope(WatchScope::recursive("/")).unwrap();

        assert_eq!(
            watcher.scopes(),
            vec![
                WatchScope::direct("/d"),
                WatchScope::direct("/d"),
                WatchScope::recursive("/"),
            ]
        );
    }

    #[test]
    fn test_scan_errors_propagate() {
        struct Broken;
        impl FileSystem for Broken {
            fn list_files(
                &self,
                _dir: &NormalizedPath,
                _recursive: bool,
            ) -> std::io::Result<Vec<NormalizedPath>> {
                Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"))
            }
        }

        let watcher = MemoryWatcherFactory::new();
        let ctx = WatchContext::new(Broken, watcher.clone());
        let err = ctx.watch_folder_contents("/d").unwrap_err();
        assert!(matches!(err, crate::Error::Scan { .. }));
        assert_eq!(watcher.subscriptions(), 0);
    }

    #[test]
    fn test_roots_resolved_before_scan_and_subscribe() {
        struct Anchored(MemoryFileSystem);
        impl FileSystem for Anchored {
            fn list_files(
                &self,
                dir: &NormalizedPath,
                recursive: bool,
            ) -> std::io::Result<Vec<NormalizedPath>> {
                self.0.list_files(dir, recursive)
            }
            fn resolve(&self, path: &NormalizedPath) -> NormalizedPath {
                NormalizedPath::new("/abs").join(path.as_str())
            }
        }

        let fs = MemoryFileSystem::new();
        fs.write_file("/abs/inbox/a");
        let watcher = MemoryWatcherFactory::new();
        let ctx = WatchContext::new(Anchored(fs), watcher.clone());

        let contents = ctx.watch_folder_contents("inbox").unwrap();
        assert_eq!(contents.scope().root.as_str(), "/abs/inbox");
        assert_eq!(contents.pending_initial(), 1);

        let signals = ctx.watch_file("inbox/ready.flag").unwrap();
        assert_eq!(signals.target().as_str(), "/abs/inbox/ready.flag");
        assert_eq!(
            watcher.scopes(),
            vec![WatchScope::direct("/abs/inbox"), WatchScope::direct("/abs/inbox")]
        );
    }
}
