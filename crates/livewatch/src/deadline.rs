//! Deadline helpers for units of work.
//!
//! Transforms passed to [`select_replace`](crate::SelectReplaceExt::select_replace)
//! are cancelled cooperatively; these helpers cover the other half, bounding
//! how long a single unit of work may take. A `None` deadline always means
//! "wait as long as it takes".

use std::future::Future;
use std::time::Duration;

use crate::error::{Error, Result};

/// Await `fut`, failing with [`Error::Timeout`] if it outlives `deadline`.
///
/// # Errors
///
/// Returns [`Error::Timeout`] labelled with `label` when the deadline expires
/// first. The work is dropped in that case.
pub async fn with_deadline<F>(label: &str, fut: F, deadline: Option<Duration>) -> Result<F::Output>
where
    F: Future,
{
    let Some(after) = deadline else {
        return Ok(fut.await);
    };

    tokio::time::timeout(after, fut).await.map_err(|_| {
        tracing::debug!(label, after_ms = after.as_millis() as u64, "deadline.expired");
        Error::timeout(label, after)
    })
}

/// Await `fut`, returning `None` if it outlives `deadline`.
pub async fn try_deadline<F>(fut: F, deadline: Option<Duration>) -> Option<F::Output>
where
    F: Future,
{
    match deadline {
        Some(after) => tokio::time::timeout(after, fut).await.ok(),
        None => Some(fut.await),
    }
}

/// Await `fut` to completion, calling `on_expiry` once if it outlives
/// `deadline`.
///
/// Returns the output together with whether the deadline expired.
pub async fn deadline_or_continue<F, C>(fut: F, deadline: Option<Duration>, on_expiry: C) -> (F::Output, bool)
where
    F: Future,
    C: FnOnce(),
{
    let Some(after) = deadline else {
        return (fut.await, false);
    };

    let mut fut = std::pin::pin!(fut);
    match tokio::time::timeout(after, fut.as_mut()).await {
        Ok(output) => (output, false),
        Err(_) => {
            on_expiry();
            (fut.await, true)
        }
    }
}
