#![no_main]

use libfuzzer_sys::fuzz_target;
use livewatch::{NormalizedPath, WatchScope};

fuzz_target!(|data: (String, String)| {
    let (raw, child) = data;
    let path = NormalizedPath::new(&raw);

    // Normalization is idempotent and never leaves a backslash behind
    let again = NormalizedPath::new(path.as_str());
    assert_eq!(path.as_str(), again.as_str());
    assert!(!path.as_str().contains('\\'));
    assert!(!path.as_str().is_empty());

    // Walking up always terminates
    let mut current = Some(path.clone());
    let mut steps = 0;
    while let Some(p) = current {
        current = p.parent();
        steps += 1;
        assert!(steps <= raw.len() + 2, "parent chain too long for {raw:?}");
    }

    // Scope checks never panic and respect the direct/recursive split
    let joined = path.join(&child);
    let direct = WatchScope::direct(path.clone()).accepts(&joined);
    let recursive = WatchScope::recursive(path).accepts(&joined);
    if direct {
        assert!(recursive);
    }
});
