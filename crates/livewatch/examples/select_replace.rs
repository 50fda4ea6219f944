//! Replace-in-flight example: a search box that only cares about the
//! latest query.
//!
//! Each keystroke produces a new query. A slow search for an old query is
//! cancelled as soon as a newer one arrives, and reports itself as stale.
//!
//! # Running
//!
//! ```bash
//! cargo run --example select_replace
//! ```

use std::convert::Infallible;
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc;
use livewatch::SelectReplaceExt;
use livewatch::deadline::with_deadline;

async fn search(query: &str) -> Vec<String> {
    // Longer queries are cheaper to answer.
    let cost = 400 / u64::try_from(query.len()).unwrap_or(1).max(1);
    tokio::time::sleep(Duration::from_millis(cost)).await;
    ["rust", "rustls", "rustup", "trust"]
        .iter()
        .filter(|w| w.contains(query))
        .map(ToString::to_string)
        .collect()
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    let (tx, rx) = mpsc::unbounded::<Result<String, Infallible>>();

    let typing = tokio::spawn(async move {
        for query in ["r", "ru", "rus", "rust"] {
            println!("[TYPE] {query}");
            let _ = tx.unbounded_send(Ok(query.to_string()));
            tokio::time::sleep(Duration::from_millis(60)).await;
        }
    });

    let results = rx.select_replace(|query, cancel| async move {
        let hits = cancel.run_until_cancelled(search(&query)).await;
        Ok::<_, Infallible>((query, hits))
    });

    let all = with_deadline("search session", results.collect::<Vec<_>>(), Some(Duration::from_secs(5))).await?;
    for result in all {
        match result {
            Ok((query, Some(hits))) => println!("[RESULT] {query}: {hits:?}"),
            Ok((query, None)) => println!("[STALE] {query}"),
            Err(never) => match never {},
        }
    }

    typing.await.map_err(|e| miette::miette!("typing task failed: {e}"))?;
    Ok(())
}
