//! Live folder example demonstrating directory watching.
//!
//! This example keeps a live list of the files in a directory and prints
//! every change.
//!
//! # Running
//!
//! ```bash
//! # Run the example (defaults to a fresh directory under the temp dir)
//! cargo run --example live_folder -- /tmp/inbox
//!
//! # In another terminal, add and remove files
//! touch /tmp/inbox/a.txt
//! rm /tmp/inbox/a.txt
//! ```

use std::fs;
use std::thread;
use std::time::Duration;

use livewatch::FolderWatchBuilder;

fn main() -> miette::Result<()> {
    let dir = std::env::args()
        .nth(1)
        .map_or_else(|| std::env::temp_dir().join("livewatch_example"), Into::into);
    fs::create_dir_all(&dir).map_err(|e| miette::miette!("cannot create {}: {e}", dir.display()))?;

    println!("Watching: {}", dir.display());
    println!("Add or remove files to see the live folder update!\n");

    let folder = FolderWatchBuilder::new(&dir)
        .on_update(|update| println!("[UPDATE] {update}"))
        .on_error(|err| eprintln!("[ERROR] {err}"))
        .build()?;

    println!("Initial files:");
    for entry in folder.entries() {
        println!("  {}", entry.path);
    }
    println!("\nWatching for changes (press Ctrl+C to exit)...\n");

    let mut last_epoch = folder.epoch();
    loop {
        if folder.wait_for_change(last_epoch, Duration::from_secs(10)) {
            last_epoch = folder.epoch();
            println!("[POLL] {} file(s)", folder.len());
        } else {
            // Quiet period; catch anything the watcher may have missed.
            folder.rescan()?;
        }

        if !folder.is_running() {
            println!("Watcher stopped");
            break;
        }
        thread::sleep(Duration::from_millis(100));
    }

    Ok(())
}
