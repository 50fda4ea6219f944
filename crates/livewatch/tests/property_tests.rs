//! Property-based tests for livewatch invariants.
//!
//! These tests verify that path normalization and the keyed collection hold
//! their invariants for all inputs, not just hand-picked cases.

#![allow(clippy::pedantic)]

use proptest::prelude::*;

// ============================================================================
// Path Normalization Properties
// ============================================================================

mod path_properties {
    use super::*;
    use livewatch::NormalizedPath;

    fn segment() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_-]{1,8}"
    }

    fn separator() -> impl Strategy<Value = &'static str> {
        prop_oneof![Just("/"), Just("\\"), Just("//"), Just("\\/"), Just("/./")]
    }

    proptest! {
        /// Normalizing never panics on any input
        #[test]
        fn normalize_never_panics(s in ".*") {
            let _ = NormalizedPath::new(&s);
        }

        /// Normalizing an already normalized path changes nothing
        #[test]
        fn normalize_is_idempotent(s in "[a-z/\\\\.]{0,24}") {
            let once = NormalizedPath::new(&s);
            let twice = NormalizedPath::new(once.as_str());
            prop_assert_eq!(once.as_str(), twice.as_str());
            prop_assert_eq!(once, twice);
        }

        /// The separator style never affects the result
        #[test]
        fn separator_style_is_irrelevant(
            parts in prop::collection::vec((segment(), separator()), 1..6),
            absolute in any::<bool>(),
        ) {
            let mut mixed = String::new();
            let mut canonical = String::new();
            if absolute {
                mixed.push('\\');
                canonical.push('/');
            }
            for (i, (seg, sep)) in parts.iter().enumerate() {
                if i > 0 {
                    mixed.push_str(sep);
                    canonical.push('/');
                }
                mixed.push_str(seg);
                canonical.push_str(seg);
            }

            let normalized = NormalizedPath::new(&mixed);
            prop_assert_eq!(normalized.as_str(), canonical.as_str());
            prop_assert!(!normalized.as_str().contains('\\'));
        }

        /// A joined child is always a child of its parent
        #[test]
        fn joined_child_is_child(
            dir in prop::collection::vec(segment(), 1..4),
            name in segment(),
        ) {
            let dir = NormalizedPath::new(format!("/{}", dir.join("/")));
            let child = dir.join(&name);
            prop_assert!(child.is_child_of(&dir));
            prop_assert!(child.is_descendant_of(&dir));
            prop_assert_eq!(child.parent(), Some(dir));
            prop_assert_eq!(child.file_name(), Some(name.as_str()));
        }
    }
}

// ============================================================================
// Live Collection Properties
// ============================================================================

mod collection_properties {
    use super::*;
    use livewatch::{CollectionUpdate, EntryOrigin, FileEntry, LiveCollection, NormalizedPath};

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, bool),
        Remove(usize),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0..6usize, any::<bool>()).prop_map(|(k, backslash)| Op::Add(k, backslash)),
            (0..6usize).prop_map(Op::Remove),
        ]
    }

    fn path(k: usize, backslash: bool) -> String {
        if backslash {
            format!("\\d\\f{k}")
        } else {
            format!("/d/f{k}")
        }
    }

    fn update(op: &Op) -> CollectionUpdate {
        match *op {
            Op::Add(k, backslash) => {
                CollectionUpdate::Add(FileEntry::new(path(k, backslash), EntryOrigin::Watcher))
            }
            Op::Remove(k) => CollectionUpdate::Remove(NormalizedPath::new(path(k, false))),
        }
    }

    proptest! {
        /// Applying any sequence matches an ordered-set model
        #[test]
        fn matches_ordered_set_model(ops in prop::collection::vec(op(), 0..40)) {
            let mut files = LiveCollection::new();
            let mut model: Vec<String> = Vec::new();

            for op in &ops {
                files.apply(&update(op));
                match *op {
                    Op::Add(k, _) => {
                        let key = path(k, false);
                        if !model.contains(&key) {
                            model.push(key);
                        }
                    }
                    Op::Remove(k) => model.retain(|m| *m != path(k, false)),
                }
            }

            let keys: Vec<String> = files.keys().map(|k| k.as_str().to_string()).collect();
            prop_assert_eq!(keys, model);
        }

        /// Reconciling always reaches the listing exactly
        #[test]
        fn reconcile_reaches_listing(
            current in prop::collection::btree_set(0..8usize, 0..8),
            listing in prop::collection::btree_set(0..8usize, 0..8),
        ) {
            let mut files: LiveCollection = current
                .iter()
                .map(|k| update(&Op::Add(*k, false)))
                .collect();
            let listing: Vec<NormalizedPath> =
                listing.iter().map(|k| NormalizedPath::new(path(*k, false))).collect();

            let updates = files.reconcile(&listing);
            for u in &updates {
                prop_assert!(files.apply(u));
            }

            let mut keys = files.paths();
            keys.sort();
            let mut expected = listing.clone();
            expected.sort();
            prop_assert_eq!(keys, expected);
            prop_assert!(files.reconcile(&listing).is_empty());
        }
    }
}
