//! Core types for watching.
//!
//! This module contains the values flowing through the watch pipeline:
//! - [`ChangeNotification`] - A created/deleted event reported by a watcher
//! - [`WatchScope`] - Which notifications a subscription accepts
//! - [`CollectionUpdate`] - An add or remove applied to a live collection
//! - [`FolderEvent`] - What a [`LiveFolder`](super::LiveFolder) publishes

use std::fmt;

use crate::error::Error;
use crate::path::NormalizedPath;

/// Kind of change reported by a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ChangeKind {
    /// An entry appeared (created, or renamed into place).
    Created,
    /// An entry disappeared (deleted, or renamed away).
    Deleted,
}

/// A single change reported by a watcher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeNotification {
    /// What happened.
    pub kind: ChangeKind,
    /// Where it happened.
    pub path: NormalizedPath,
}

impl ChangeNotification {
    /// A `Created` notification.
    pub fn created(path: impl Into<NormalizedPath>) -> Self {
        Self {
            kind: ChangeKind::Created,
            path: path.into(),
        }
    }

    /// A `Deleted` notification.
    pub fn deleted(path: impl Into<NormalizedPath>) -> Self {
        Self {
            kind: ChangeKind::Deleted,
            path: path.into(),
        }
    }
}

impl fmt::Display for ChangeNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ChangeKind::Created => write!(f, "created: {}", self.path),
            ChangeKind::Deleted => write!(f, "deleted: {}", self.path),
        }
    }
}

/// The path boundary within which notifications are accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WatchScope {
    /// Directory being watched.
    pub root: NormalizedPath,
    /// Accept changes anywhere below `root`, not only direct children.
    #[cfg_attr(feature = "serde", serde(default))]
    pub recursive: bool,
}

impl WatchScope {
    /// Scope accepting direct children of `root` only.
    pub fn direct(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
        }
    }

    /// Scope accepting everything below `root`.
    pub fn recursive(root: impl Into<NormalizedPath>) -> Self {
        Self {
            root: root.into(),
            recursive: true,
        }
    }

    /// Returns `true` if a change at `path` belongs to this scope.
    #[must_use]
    pub fn accepts(&self, path: &NormalizedPath) -> bool {
        if self.recursive {
            path.is_descendant_of(&self.root)
        } else {
            path.is_child_of(&self.root)
        }
    }
}

/// Where a collection entry was first seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryOrigin {
    /// Found by the initial directory scan (or a rescan).
    Scan,
    /// Reported by the watcher after subscription.
    Watcher,
}

/// A file tracked by a live collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Normalized path of the file, also its key.
    pub path: NormalizedPath,
    /// How the entry was discovered.
    pub origin: EntryOrigin,
}

impl FileEntry {
    /// Create an entry.
    pub fn new(path: impl Into<NormalizedPath>, origin: EntryOrigin) -> Self {
        Self {
            path: path.into(),
            origin,
        }
    }

    /// The entry's file name.
    #[must_use]
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name()
    }
}

/// An add or remove for a keyed live collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionUpdate {
    /// Insert the entry, replacing any entry with the same key in place.
    Add(FileEntry),
    /// Remove the entry with this key, if present.
    Remove(NormalizedPath),
}

impl CollectionUpdate {
    /// The key this update touches.
    #[must_use]
    pub const fn key(&self) -> &NormalizedPath {
        match self {
            Self::Add(entry) => &entry.path,
            Self::Remove(path) => path,
        }
    }

    /// Returns `true` for an add.
    #[must_use]
    pub const fn is_add(&self) -> bool {
        matches!(self, Self::Add(_))
    }
}

impl fmt::Display for CollectionUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add(entry) => write!(f, "add: {}", entry.path),
            Self::Remove(path) => write!(f, "remove: {path}"),
        }
    }
}

/// Event published by a running [`LiveFolder`](super::LiveFolder).
#[derive(Debug)]
#[non_exhaustive]
pub enum FolderEvent {
    /// An update was applied to the collection.
    Updated(CollectionUpdate),
    /// A requested rescan failed. The collection is unchanged and the
    /// subscription keeps running.
    RescanFailed(Error),
    /// The subscription ended with an error; no further events follow.
    Faulted(Error),
}
