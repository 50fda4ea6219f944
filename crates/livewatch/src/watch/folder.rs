//! Live folder contents as a stream of collection updates.
//!
//! [`FolderContents`] replays the initial scan as adds, then translates
//! accepted watcher notifications into adds and removes. Applying its items
//! in order to a [`LiveCollection`](super::LiveCollection) yields the
//! current file set of the folder.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::stream::{FusedStream, Stream, StreamExt};

use super::backend::WatcherFactory;
use super::source::{self, ChangeStream};
use super::types::{ChangeKind, ChangeNotification, CollectionUpdate, EntryOrigin, FileEntry, WatchScope};
use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// Stream of updates keeping a collection in sync with a folder.
///
/// Created through [`WatchContext::watch_folder_contents`](super::WatchContext::watch_folder_contents)
/// or [`watch_folder_contents`](super::watch_folder_contents).
#[must_use = "streams do nothing unless polled"]
pub struct FolderContents {
    scope: WatchScope,
    initial: VecDeque<CollectionUpdate>,
    changes: ChangeStream,
    terminated: bool,
}

impl FolderContents {
    /// The scope notifications are filtered by.
    #[must_use]
    pub const fn scope(&self) -> &WatchScope {
        &self.scope
    }

    /// Number of initial-scan adds not yet yielded.
    #[must_use]
    pub fn pending_initial(&self) -> usize {
        self.initial.len()
    }

    /// Take the initial-scan adds without polling.
    pub(crate) fn drain_initial(&mut self) -> impl Iterator<Item = CollectionUpdate> + '_ {
        self.initial.drain(..)
    }

    fn translate(&self, notification: ChangeNotification) -> Option<CollectionUpdate> {
        if !self.scope.accepts(&notification.path) {
            tracing::trace!(path = %notification.path, root = %self.scope.root, "folder.out_of_scope");
            return None;
        }

        Some(match notification.kind {
            ChangeKind::Created => {
                CollectionUpdate::Add(FileEntry::new(notification.path, EntryOrigin::Watcher))
            }
            ChangeKind::Deleted => CollectionUpdate::Remove(notification.path),
        })
    }
}

/// Scan the scope's root, then subscribe to it.
///
/// The scan happens first so every file present at subscription time is
/// yielded before any notification.
pub(crate) fn subscribe(
    fs: &dyn FileSystem,
    watcher: &dyn WatcherFactory,
    scope: WatchScope,
) -> Result<FolderContents> {
    let files = match fs.list_files(&scope.root, scope.recursive) {
        Ok(files) => files,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(root = %scope.root, "folder.root_missing");
            Vec::new()
        }
        Err(e) => return Err(Error::scan(scope.root.to_path_buf(), e)),
    };
    tracing::debug!(root = %scope.root, files = files.len(), "folder.scanned");

    let initial = files
        .into_iter()
        .map(|path| CollectionUpdate::Add(FileEntry::new(path, EntryOrigin::Scan)))
        .collect();
    let changes = source::subscribe(watcher, scope.clone())?;

    Ok(FolderContents {
        scope,
        initial,
        changes,
        terminated: false,
    })
}

impl Stream for FolderContents {
    type Item = Result<CollectionUpdate>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        if let Some(update) = self.initial.pop_front() {
            return Poll::Ready(Some(Ok(update)));
        }

        loop {
            match ready!(self.changes.poll_next_unpin(cx)) {
                Some(Ok(notification)) => {
                    if let Some(update) = self.translate(notification) {
                        return Poll::Ready(Some(Ok(update)));
                    }
                }
                Some(Err(err)) => {
                    self.terminated = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    self.terminated = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl FusedStream for FolderContents {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl std::fmt::Debug for FolderContents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FolderContents")
            .field("scope", &self.scope)
            .field("pending_initial", &self.initial.len())
            .field("terminated", &self.terminated)
            .finish()
    }
}
