//! Keyed projection of collection updates.

use indexmap::IndexMap;
use indexmap::map::Entry;

use super::types::{CollectionUpdate, EntryOrigin, FileEntry};
use crate::path::NormalizedPath;

/// Insertion-ordered set of files keyed by normalized path.
///
/// Applying a [`FolderContents`](super::FolderContents) stream in order
/// keeps this in sync with the folder. Each key appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LiveCollection {
    entries: IndexMap<NormalizedPath, FileEntry>,
}

impl LiveCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if an entry with this key exists.
    #[must_use]
    pub fn contains(&self, path: &NormalizedPath) -> bool {
        self.entries.contains_key(path)
    }

    /// Look up an entry by key.
    #[must_use]
    pub fn get(&self, path: &NormalizedPath) -> Option<&FileEntry> {
        self.entries.get(path)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &NormalizedPath> {
        self.entries.keys()
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.values()
    }

    /// Owned copy of the keys, in insertion order.
    #[must_use]
    pub fn paths(&self) -> Vec<NormalizedPath> {
        self.entries.keys().cloned().collect()
    }

    /// Apply one update. Returns `true` if the collection changed.
    ///
    /// An add for an existing key replaces the entry in place, keeping its
    /// position. A remove for an unknown key does nothing.
    pub fn apply(&mut self, update: &CollectionUpdate) -> bool {
        match update {
            CollectionUpdate::Add(entry) => match self.entries.entry(entry.path.clone()) {
                Entry::Occupied(mut slot) => {
                    if slot.get() == entry {
                        false
                    } else {
                        slot.insert(entry.clone());
                        true
                    }
                }
                Entry::Vacant(slot) => {
                    slot.insert(entry.clone());
                    true
                }
            },
            CollectionUpdate::Remove(path) => self.entries.shift_remove(path).is_some(),
        }
    }

    /// Updates that turn this collection into exactly `listing`.
    ///
    /// Removes for vanished keys come first, then adds for new keys in
    /// listing order. Entries present in both are left alone.
    #[must_use]
    pub fn reconcile(&self, listing: &[NormalizedPath]) -> Vec<CollectionUpdate> {
        let wanted: indexmap::IndexSet<&NormalizedPath> = listing.iter().collect();

        let removes = self
            .entries
            .keys()
            .filter(|key| !wanted.contains(key))
            .cloned()
            .map(CollectionUpdate::Remove);
        let adds = wanted
            .iter()
            .filter(|path| !self.entries.contains_key(**path))
            .map(|path| CollectionUpdate::Add(FileEntry::new((*path).clone(), EntryOrigin::Scan)));

        removes.chain(adds).collect()
    }
}

impl FromIterator<CollectionUpdate> for LiveCollection {
    fn from_iter<I: IntoIterator<Item = CollectionUpdate>>(iter: I) -> Self {
        let mut collection = Self::new();
        for update in iter {
            collection.apply(&update);
        }
        collection
    }
}

impl Extend<CollectionUpdate> for LiveCollection {
    fn extend<I: IntoIterator<Item = CollectionUpdate>>(&mut self, iter: I) {
        for update in iter {
            self.apply(&update);
        }
    }
}
