#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use livewatch::{CollectionUpdate, EntryOrigin, FileEntry, LiveCollection, NormalizedPath};

/// One operation against a small key space
#[derive(Debug, Arbitrary)]
enum Op {
    Add { key: u8, backslash: bool },
    Remove { key: u8 },
}

fn path(key: u8, backslash: bool) -> String {
    let key = key % 16;
    if backslash {
        format!("\\d\\f{key}")
    } else {
        format!("/d/f{key}")
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let mut files = LiveCollection::new();
    for op in &ops {
        let update = match *op {
            Op::Add { key, backslash } => {
                CollectionUpdate::Add(FileEntry::new(path(key, backslash), EntryOrigin::Watcher))
            }
            Op::Remove { key } => CollectionUpdate::Remove(NormalizedPath::new(path(key, false))),
        };
        files.apply(&update);
    }

    // Keys stay unique
    let mut keys = files.paths();
    let len = keys.len();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), len);

    // Reconciling with the current keys is a no-op
    assert!(files.reconcile(&files.paths()).is_empty());
});
