//! # livewatch
//!
//! Reactive building blocks for keeping in-memory state in sync with the
//! filesystem.
//!
//! `livewatch` provides two pieces that are usually found together in
//! file-driven pipelines:
//!
//! - **Replace-in-flight mapping** - [`SelectReplaceExt::select_replace`]
//!   maps a stream through an async transform, cancelling the running
//!   transform whenever a newer value arrives
//! - **Live folder contents** - [`watch_folder_contents`] and
//!   [`LiveFolder`] keep a keyed collection of the files in a folder, built
//!   from an initial scan plus watcher notifications
//!
//! ## Features
//!
//! - **Cooperative cancellation** - Transforms observe a [`CancelHandle`]
//!   and decide what a cancelled unit of work returns
//! - **Mutual exclusion** - At most one transform is running at any time
//! - **Path normalization** - `/` and `\` are treated alike, so keys never
//!   duplicate across separator styles
//! - **Scope filtering** - Notifications outside the watched folder are dropped
//! - **Pluggable backends** - Real filesystem and `notify`, or the in-memory
//!   doubles in [`memory`]
//! - **Rich diagnostics** - Errors carry codes and help via [`miette`]
//!
//! ## Quick Start
//!
//! ```no_run
//! use futures::StreamExt;
//! use livewatch::{LiveCollection, watch_folder_contents};
//!
//! # async fn run() -> livewatch::Result<()> {
//! let mut contents = watch_folder_contents("./inbox")?;
//! let mut files = LiveCollection::new();
//!
//! while let Some(update) = contents.next().await {
//!     files.apply(&update?);
//!     println!("{} files", files.len());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Replacing In-Flight Work
//!
//! ```
//! use futures::{StreamExt, stream};
//! use livewatch::SelectReplaceExt;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let doubled: Vec<Result<i32, ()>> = stream::iter([Ok(1), Ok(2)])
//!     .select_replace(|n, cancel| async move {
//!         match cancel.run_until_cancelled(async { n * 2 }).await {
//!             Some(v) => Ok::<_, ()>(v),
//!             None => Ok(-1),
//!         }
//!     })
//!     .collect()
//!     .await;
//!
//! assert_eq!(doubled.last(), Some(&Ok(4)));
//! # }
//! ```
//!
//! ## Error Output Example
//!
//! ```text
//! livewatch::watcher_fault
//!
//!   × file watcher fault: handle invalidated
//!   help: The subscription has ended. Subscribe again to resume watching.
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | `Serialize`/`Deserialize` for paths, scopes and notifications |

#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// Re-export miette for users
pub use miette;

mod cancel;
pub mod deadline;
mod error;
pub mod fs;
pub mod memory;
mod path;
mod replace;
pub mod watch;

pub use cancel::CancelHandle;
pub use error::{Error, Result};
pub use fs::{FileSystem, OsFileSystem};
pub use path::NormalizedPath;
pub use replace::{SelectReplace, SelectReplaceExt};

pub use watch::{
    ChangeKind, ChangeNotification, ChangeStream, CollectionUpdate, EntryOrigin, FileEntry,
    FileSignals, FolderContents, FolderEvent, FolderWatchBuilder, LiveCollection, LiveFolder,
    NotifyWatcherFactory, SharedCollection, WatchContext, WatchScope, WatcherFactory, watch_file,
    watch_folder_contents,
};
