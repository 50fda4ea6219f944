//! Integration tests for the replace-in-flight combinator.
//!
//! Timing-sensitive tests run on tokio's paused clock, so sleeps advance
//! virtual time deterministically.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use futures::channel::mpsc;
use futures::stream::FusedStream;
use livewatch::{CancelHandle, SelectReplaceExt};
use tokio::time::sleep;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

// ============================================================================
// Mutual Exclusion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_at_most_one_transform_runs() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (tx, rx) = mpsc::unbounded::<Result<u64, Infallible>>();

    let task = {
        let active = active.clone();
        let peak = peak.clone();
        tokio::spawn(
            rx.select_replace(move |delay, cancel| {
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    let finished = cancel.run_until_cancelled(sleep(ms(delay))).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, Infallible>(finished.map(|()| delay))
                }
            })
            .collect::<Vec<_>>(),
        )
    };

    for delay in [50, 10, 30, 5, 100, 1] {
        tx.unbounded_send(Ok(delay)).unwrap();
        sleep(ms(3)).await;
    }
    drop(tx);

    let out = task.await.unwrap();
    assert_eq!(peak.load(Ordering::SeqCst), 1);
    assert_eq!(active.load(Ordering::SeqCst), 0);
    assert_eq!(out.last(), Some(&Ok(Some(1))));
}

// ============================================================================
// Prompt Cancellation
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_previous_handle_cancelled_before_next_starts() {
    let handles: Arc<Mutex<Vec<CancelHandle>>> = Arc::default();
    let log: Arc<Mutex<Vec<String>>> = Arc::default();
    let (tx, rx) = mpsc::unbounded::<Result<u32, Infallible>>();

    let task = {
        let handles = handles.clone();
        let log = log.clone();
        tokio::spawn(
            rx.select_replace(move |v, cancel| {
                let prior_cancelled = {
                    let mut handles = handles.lock().unwrap();
                    let all = handles.iter().all(CancelHandle::is_cancelled);
                    handles.push(cancel.clone());
                    all
                };
                log.lock().unwrap().push(format!("start {v}"));
                let log = log.clone();
                async move {
                    let _ = cancel.run_until_cancelled(sleep(Duration::from_secs(60))).await;
                    log.lock().unwrap().push(format!("end {v}"));
                    Ok::<_, Infallible>((v, prior_cancelled))
                }
            })
            .collect::<Vec<_>>(),
        )
    };

    for v in 1..=3 {
        tx.unbounded_send(Ok(v)).unwrap();
        sleep(ms(10)).await;
    }
    drop(tx);

    let out = task.await.unwrap();
    assert_eq!(out, vec![Ok((1, true)), Ok((2, true)), Ok((3, true))]);
    assert_eq!(
        *log.lock().unwrap(),
        ["start 1", "end 1", "start 2", "end 2", "start 3", "end 3"]
    );

    let handles = handles.lock().unwrap();
    assert!(handles[0].is_cancelled());
    assert!(handles[1].is_cancelled());
    assert!(!handles[2].is_cancelled());
    assert!(handles[0].generation() < handles[1].generation());
}

#[tokio::test(start_paused = true)]
async fn test_superseded_queued_value_runs_with_cancelled_handle() {
    let started: Arc<Mutex<Vec<(u32, bool)>>> = Arc::default();
    let (tx, rx) = mpsc::unbounded::<Result<u32, Infallible>>();

    let task = {
        let started = started.clone();
        tokio::spawn(
            rx.select_replace(move |v, cancel| {
                started.lock().unwrap().push((v, cancel.is_cancelled()));
                async move {
                    match cancel.run_until_cancelled(sleep(ms(100))).await {
                        Some(()) => Ok::<_, Infallible>(i64::from(v)),
                        None => Ok(-1),
                    }
                }
            })
            .collect::<Vec<_>>(),
        )
    };

    tx.unbounded_send(Ok(1)).unwrap();
    sleep(ms(10)).await;
    // Both arrive while 1 is still running; 2 is already stale when it starts.
    tx.unbounded_send(Ok(2)).unwrap();
    tx.unbounded_send(Ok(3)).unwrap();
    drop(tx);

    let out = task.await.unwrap();
    assert_eq!(out, vec![Ok(-1), Ok(-1), Ok(3)]);
    assert_eq!(*started.lock().unwrap(), [(1, false), (2, true), (3, false)]);
}

// ============================================================================
// Deferred Completion
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_completion_waits_for_last_transform() {
    let results: Arc<Mutex<Vec<i64>>> = Arc::default();
    let (tx, rx) = mpsc::unbounded::<Result<u64, Infallible>>();

    let task = {
        let results = results.clone();
        tokio::spawn(
            rx.select_replace(move |delay, cancel| {
                let results = results.clone();
                async move {
                    match cancel.run_until_cancelled(sleep(ms(delay))).await {
                        Some(()) => {
                            let value = i64::try_from(delay).unwrap_or(i64::MAX);
                            results.lock().unwrap().push(value);
                            Ok::<_, Infallible>(value)
                        }
                        None => Ok(-1),
                    }
                }
            })
            .collect::<Vec<_>>(),
        )
    };

    tx.unbounded_send(Ok(10_000)).unwrap();
    sleep(ms(5_000)).await;

    // Supersede halfway through, then end the source.
    tx.unbounded_send(Ok(1_000)).unwrap();
    drop(tx);

    sleep(ms(990)).await;
    assert!(results.lock().unwrap().is_empty());
    assert!(!task.is_finished());

    sleep(ms(20)).await;
    let out = task.await.unwrap();
    assert_eq!(out, vec![Ok(-1), Ok(1_000)]);
    assert_eq!(*results.lock().unwrap(), [1_000]);
}

#[tokio::test(start_paused = true)]
async fn test_transform_ignoring_cancellation_still_emits() {
    let (tx, rx) = mpsc::unbounded::<Result<u64, Infallible>>();
    let handles: Arc<Mutex<Vec<CancelHandle>>> = Arc::default();

    let task = {
        let handles = handles.clone();
        tokio::spawn(
            rx.select_replace(move |delay, cancel| {
                handles.lock().unwrap().push(cancel);
                async move {
                    sleep(ms(delay)).await;
                    Ok::<_, Infallible>(delay)
                }
            })
            .collect::<Vec<_>>(),
        )
    };

    tx.unbounded_send(Ok(100)).unwrap();
    sleep(ms(10)).await;
    tx.unbounded_send(Ok(50)).unwrap();
    drop(tx);

    let out = task.await.unwrap();
    assert_eq!(out, vec![Ok(100), Ok(50)]);
    assert!(handles.lock().unwrap()[0].is_cancelled());
}

// ============================================================================
// Errors
// ============================================================================

#[tokio::test]
async fn test_transform_error_ends_stream() {
    let (tx, rx) = mpsc::unbounded::<Result<u32, String>>();
    let mut out = rx.select_replace(|v, _cancel| async move {
        if v == 2 {
            Err(format!("bad value {v}"))
        } else {
            Ok(v)
        }
    });

    tx.unbounded_send(Ok(1)).unwrap();
    assert_eq!(out.next().await, Some(Ok(1)));

    tx.unbounded_send(Ok(2)).unwrap();
    assert_eq!(out.next().await, Some(Err("bad value 2".to_string())));

    tx.unbounded_send(Ok(3)).unwrap();
    assert_eq!(out.next().await, None);
    assert!(out.is_terminated());
}

#[tokio::test]
async fn test_source_error_cancels_in_flight_and_ends_stream() {
    let (tx, rx) = mpsc::unbounded::<Result<u32, String>>();
    let (handle_tx, mut handle_rx) = mpsc::unbounded::<CancelHandle>();

    let mut out = rx.select_replace(move |v, cancel| {
        handle_tx.unbounded_send(cancel.clone()).unwrap();
        async move {
            cancel.cancelled().await;
            Ok::<_, String>(v)
        }
    });

    tx.unbounded_send(Ok(1)).unwrap();
    assert!(futures::poll!(out.next()).is_pending());
    let running = handle_rx.next().await.unwrap();

    tx.unbounded_send(Err("source broke".to_string())).unwrap();
    assert_eq!(out.next().await, Some(Err("source broke".to_string())));
    assert!(running.is_cancelled());
    assert!(!out.is_in_flight());
    assert_eq!(out.next().await, None);
}
