//! Filesystem watching and live folder contents.
//!
//! This module turns watcher notifications into live views of a folder.
//!
//! # Layers
//!
//! - **Raw notifications** - [`ChangeStream`] forwards every created/deleted
//!   change a watcher reports, in order
//! - **File signals** - [`FileSignals`] fires each time one file is created
//! - **Folder contents** - [`FolderContents`] yields the initial scan as adds,
//!   then scope-filtered adds and removes
//! - **Live folder** - [`LiveFolder`] applies those updates on a background
//!   thread and serves snapshots
//!
//! # Quick Start
//!
//! ```no_run
//! use livewatch::FolderWatchBuilder;
//! use std::time::Duration;
//!
//! fn main() -> livewatch::Result<()> {
//!     let folder = FolderWatchBuilder::new("./inbox")
//!         .on_update(|update| println!("{update}"))
//!         .on_error(|err| eprintln!("watch failed: {err}"))
//!         .build()?;
//!
//!     let epoch = folder.epoch();
//!     if folder.wait_for_change(epoch, Duration::from_secs(30)) {
//!         println!("{} files", folder.len());
//!     }
//!
//!     folder.stop();
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐     ┌────────────────┐     ┌──────────────────┐
//! │WatcherFactory│────▶│ FolderContents │────▶│ SharedCollection │
//! │  (notify)    │     │ (scan + filter)│     │(RwLock<Arc<..>>) │
//! └──────────────┘     └────────────────┘     └──────────────────┘
//!                              │                       │
//!                              ▼                       ▼
//!                       ┌─────────────┐         ┌────────────┐
//!                       │  Callbacks  │         │ LiveFolder │
//!                       │ (on_update) │         │ (user API) │
//!                       └─────────────┘         └────────────┘
//! ```
//!
//! # Faults
//!
//! A watcher fault is terminal. The stream yields the error and ends; a
//! [`LiveFolder`] stops, keeps its last snapshot, and reports the error to
//! `on_error`. There is no automatic resubscription.
//!
//! # Backends
//!
//! Every operation goes through a [`WatchContext`], which pairs a
//! [`FileSystem`](crate::FileSystem) with a [`WatcherFactory`]. The default
//! context uses the real filesystem and [`NotifyWatcherFactory`]; the
//! [`memory`](crate::memory) module provides deterministic replacements.

mod backend;
mod builder;
mod collection;
mod container;
mod context;
mod file;
mod folder;
mod handle;
mod source;
mod types;
mod watcher;

// Public API
pub use builder::{ErrorCallback, FolderWatchBuilder, UpdateCallback};
pub use collection::LiveCollection;
pub use container::SharedCollection;
pub use context::{WatchContext, watch_file, watch_folder_contents};
pub use file::FileSignals;
pub use folder::FolderContents;
pub use handle::LiveFolder;
pub use source::ChangeStream;
pub use types::{
    ChangeKind, ChangeNotification, CollectionUpdate, EntryOrigin, FileEntry, FolderEvent,
    WatchScope,
};

// Backend plumbing
pub use backend::{NotificationSink, NotifyWatcherFactory, WatcherFactory, WatcherHandle};
