//! Builder for configuring live folders.
//!
//! The [`FolderWatchBuilder`] provides a fluent API for choosing what to
//! watch, which capabilities to watch it with, and which callbacks to run.

use std::sync::Arc;

use super::backend::{NotifyWatcherFactory, WatcherFactory};
use super::context::WatchContext;
use super::folder::FolderContents;
use super::handle::LiveFolder;
use super::types::{CollectionUpdate, WatchScope};
use super::watcher::{FolderWatcher, WatcherConfig};
use crate::error::{Error, Result};
use crate::fs::{FileSystem, OsFileSystem};
use crate::path::NormalizedPath;

/// Callback type for applied updates.
pub type UpdateCallback = Box<dyn Fn(CollectionUpdate) + Send + Sync + 'static>;

/// Callback type for rescan failures and watcher faults.
pub type ErrorCallback = Box<dyn Fn(Error) + Send + Sync + 'static>;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Builder for configuring a live folder.
///
/// `FolderWatchBuilder` provides a fluent API for setting up a live folder
/// with customizable options including:
/// - Recursion into subdirectories
/// - Filesystem and watcher backends
/// - Update and error callbacks
///
/// # Example
///
/// ```ignore
/// let folder = FolderWatchBuilder::new("/var/spool/inbox")
///     .recursive(true)
///     .on_update(|update| println!("{update}"))
///     .on_error(|err| eprintln!("watch failed: {err}"))
///     .build()?;
///
/// for entry in folder.entries() {
///     println!("{}", entry.path);
/// }
/// ```
pub struct FolderWatchBuilder {
    /// Folder to watch.
    root: NormalizedPath,

    /// Whether subdirectories are included (default: false).
    recursive: bool,

    /// Filesystem used for scans.
    fs: Arc<dyn FileSystem>,

    /// Factory used for the subscription.
    watcher: Arc<dyn WatcherFactory>,

    /// Capacity of the event channel (default: 64).
    channel_capacity: usize,

    /// Callback for applied updates.
    on_update: Option<UpdateCallback>,

    /// Callback for errors.
    on_error: Option<ErrorCallback>,
}

impl FolderWatchBuilder {
    /// Create a builder for `root` with default settings.
    ///
    /// Default settings:
    /// - Direct children only
    /// - Real filesystem and `notify` watcher
    /// - Event channel capacity of 64
    /// - No callbacks
    #[must_use]
    pub fn new(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            fs: Arc::new(OsFileSystem),
            watcher: Arc::new(NotifyWatcherFactory),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            on_update: None,
            on_error: None,
        }
    }

    /// Include files in subdirectories.
    #[must_use]
    pub const fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Use `fs` for the initial scan and rescans.
    #[must_use]
    pub fn file_system(mut self, fs: impl FileSystem + 'static) -> Self {
        self.fs = Arc::new(fs);
        self
    }

    /// Use `watcher` for the subscription.
    #[must_use]
    pub fn watcher_factory(mut self, watcher: impl WatcherFactory + 'static) -> Self {
        self.watcher = Arc::new(watcher);
        self
    }

    /// Use both capabilities of `ctx`.
    #[must_use]
    pub fn context(mut self, ctx: &WatchContext) -> Self {
        self.fs = ctx.file_system().clone();
        self.watcher = ctx.watcher_factory().clone();
        self
    }

    /// Set the capacity of the event channel. Values below 1 are raised to 1.
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Register a callback for applied updates.
    ///
    /// The callback runs on a dedicated thread, once per update that
    /// changed the collection, in application order.
    #[must_use]
    pub fn on_update<F>(mut self, callback: F) -> Self
    where
        F: Fn(CollectionUpdate) + Send + Sync + 'static,
    {
        self.on_update = Some(Box::new(callback));
        self
    }

    /// Register a callback for errors.
    ///
    /// Receives failed rescans (the folder keeps running) and watcher faults
    /// (the folder stops).
    #[must_use]
    pub fn on_error<F>(mut self, callback: F) -> Self
    where
        F: Fn(Error) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(callback));
        self
    }

    /// The scope this builder will watch, as configured. The root is resolved
    /// against the file system when the subscription is made.
    #[must_use]
    pub fn scope(&self) -> WatchScope {
        WatchScope {
            root: self.root.clone(),
            recursive: self.recursive,
        }
    }

    fn watch_context(&self) -> WatchContext {
        WatchContext::from_shared(self.fs.clone(), self.watcher.clone())
    }

    /// Subscribe without materializing: the raw update stream.
    ///
    /// Callbacks and channel capacity are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Scan`] if the folder cannot be listed, or an error
    /// if the watcher cannot be created.
    pub fn into_stream(self) -> Result<FolderContents> {
        self.watch_context().watch_folder_contents_in(self.scope())
    }

    /// Build and start the live folder.
    ///
    /// The initial scan is applied before this returns. A background thread
    /// then applies every change.
    ///
    /// # Errors
    ///
    /// Returns [`Error`] if:
    /// - The folder exists but cannot be listed
    /// - The watcher cannot be created
    /// - The drain thread cannot be spawned
    pub fn build(self) -> Result<LiveFolder> {
        let watcher_config = WatcherConfig {
            scope: self.scope(),
            channel_capacity: self.channel_capacity,
        };

        let watcher = FolderWatcher::start(&self.watch_context(), watcher_config)?;
        tracing::info!(root = %self.root, recursive = self.recursive, "live folder started");

        Ok(LiveFolder::new(watcher, self.on_update, self.on_error))
    }
}

impl std::fmt::Debug for FolderWatchBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderWatchBuilder")
            .field("root", &self.root)
            .field("recursive", &self.recursive)
            .field("channel_capacity", &self.channel_capacity)
            .field("on_update", &self.on_update.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}
