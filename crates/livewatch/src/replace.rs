//! The replace-in-flight stream combinator.
//!
//! [`SelectReplaceExt::select_replace`] maps each value of a fallible source
//! stream through an async transform, keeping at most one transform alive.
//! A newer source value signals the running transform's [`CancelHandle`] and
//! waits for it to return before starting.
//!
//! ```text
//! source:     v1 ─────── v2 ── v3 ──────┤
//! transform:  [v1 ······x]              (cancelled at v2, returns its sentinel)
//!                        [v2 x]           (superseded while queued, starts cancelled)
//!                             [v3 ·······]
//! output:              r1    r2        r3 ┤
//! ```
//!
//! Every source value reaches the transform, and every value a transform
//! returns is emitted, including whatever it chose to return after observing
//! cancellation. Filtering stale results is the transform's decision, not
//! the combinator's.

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::TryFuture;
use futures::stream::{FusedStream, Stream, TryStream};
use pin_project_lite::pin_project;
use tokio_util::sync::DropGuard;

use crate::cancel::{CancelHandle, GenerationClock};

/// Extension trait adding [`select_replace`](SelectReplaceExt::select_replace)
/// to every fallible stream.
pub trait SelectReplaceExt: TryStream + Sized {
    /// Map each value through `transform`, cancelling the running transform
    /// whenever a newer value arrives.
    ///
    /// Guarantees:
    ///
    /// - at most one transform future is alive and polled at a time
    /// - the running transform's handle is cancelled before the next one starts
    /// - values superseded while waiting still run, in arrival order, with a
    ///   handle that is already cancelled
    /// - the output ends only after the source ended and the last transform
    ///   returned
    /// - a source error is forwarded immediately and ends the stream; a
    ///   transform error ends the stream the same way
    ///
    /// # Example
    ///
    /// ```ignore
    /// let results = queries
    ///     .select_replace(|query, cancel| async move {
    ///         match cancel.run_until_cancelled(search(query)).await {
    ///             Some(hits) => Ok(Some(hits)),
    ///             None => Ok(None),
    ///         }
    ///     });
    /// ```
    fn select_replace<F, Fut>(self, transform: F) -> SelectReplace<Self, F, Fut, Self::Ok>
    where
        F: FnMut(Self::Ok, CancelHandle) -> Fut,
        Fut: TryFuture<Error = Self::Error>,
    {
        SelectReplace::new(self, transform)
    }
}

impl<S: TryStream> SelectReplaceExt for S {}

struct InFlight<Fut> {
    handle: CancelHandle,
    // Cancels the handle if the combinator is dropped mid-flight.
    guard: DropGuard,
    future: Pin<Box<Fut>>,
}

struct Pending<T> {
    generation: u64,
    value: T,
}

pin_project! {
    /// Stream returned by [`SelectReplaceExt::select_replace`].
    #[must_use = "streams do nothing unless polled"]
    pub struct SelectReplace<S, F, Fut, T> {
        #[pin]
        source: S,
        transform: F,
        clock: GenerationClock,
        in_flight: Option<InFlight<Fut>>,
        pending: VecDeque<Pending<T>>,
        source_done: bool,
        terminated: bool,
    }
}

impl<S, F, Fut, T> SelectReplace<S, F, Fut, T> {
    pub(crate) fn new(source: S, transform: F) -> Self {
        Self {
            source,
            transform,
            clock: GenerationClock::default(),
            in_flight: None,
            pending: VecDeque::new(),
            source_done: false,
            terminated: false,
        }
    }

    /// Returns `true` while a transform is running.
    #[must_use]
    pub const fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The most recently minted generation.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.clock.current()
    }
}

fn start<F, Fut, T>(transform: &mut F, generation: u64, value: T, superseded: bool) -> InFlight<Fut>
where
    F: FnMut(T, CancelHandle) -> Fut,
{
    tracing::trace!(generation, superseded, "select_replace.start");
    let handle = CancelHandle::new(generation);
    if superseded {
        handle.cancel();
    }
    let guard = handle.drop_guard();
    let future = Box::pin(transform(value, handle.clone()));
    InFlight {
        handle,
        guard,
        future,
    }
}

impl<S, F, Fut> Stream for SelectReplace<S, F, Fut, S::Ok>
where
    S: TryStream,
    F: FnMut(S::Ok, CancelHandle) -> Fut,
    Fut: TryFuture<Error = S::Error>,
{
    type Item = Result<Fut::Ok, S::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        if *this.terminated {
            return Poll::Ready(None);
        }

        // Stage 1: Drain whatever the source has ready.
        while !*this.source_done {
            match this.source.as_mut().try_poll_next(cx) {
                Poll::Ready(Some(Ok(value))) => {
                    let generation = this.clock.next();
                    match this.in_flight.as_ref() {
                        Some(running) => {
                            tracing::trace!(
                                generation,
                                superseded = running.handle.generation(),
                                "select_replace.cancel"
                            );
                            running.handle.cancel();
                            this.pending.push_back(Pending { generation, value });
                        }
                        None => {
                            *this.in_flight =
                                Some(start(&mut *this.transform, generation, value, false));
                        }
                    }
                }
                Poll::Ready(Some(Err(err))) => {
                    tracing::debug!(generation = this.clock.current(), "select_replace.source_error");
                    if let Some(running) = this.in_flight.take() {
                        running.handle.cancel();
                    }
                    this.pending.clear();
                    *this.terminated = true;
                    return Poll::Ready(Some(Err(err)));
                }
                Poll::Ready(None) => {
                    let generation = this.clock.next();
                    tracing::trace!(generation, "select_replace.source_complete");
                    *this.source_done = true;
                }
                Poll::Pending => break,
            }
        }

        // Stage 2: Drive the single in-flight transform, promoting queued values.
        // Anything queued behind another value has already been superseded.
        loop {
            if this.in_flight.is_none() {
                match this.pending.pop_front() {
                    Some(Pending { generation, value }) => {
                        let superseded = !this.pending.is_empty();
                        *this.in_flight =
                            Some(start(&mut *this.transform, generation, value, superseded));
                    }
                    None => break,
                }
            }

            let Some(running) = this.in_flight.as_mut() else {
                break;
            };

            let result = match running.future.as_mut().try_poll(cx) {
                Poll::Ready(result) => result,
                Poll::Pending => return Poll::Pending,
            };

            if let Some(finished) = this.in_flight.take() {
                tracing::trace!(generation = finished.handle.generation(), "select_replace.finish");
                finished.guard.disarm();
            }

            return match result {
                Ok(output) => Poll::Ready(Some(Ok(output))),
                Err(err) => {
                    this.pending.clear();
                    *this.terminated = true;
                    Poll::Ready(Some(Err(err)))
                }
            };
        }

        // Stage 3: Complete once the source is done and nothing is left to run.
        if *this.source_done {
            tracing::trace!(generation = this.clock.current(), "select_replace.complete");
            *this.terminated = true;
            Poll::Ready(None)
        } else {
            Poll::Pending
        }
    }
}

impl<S, F, Fut> FusedStream for SelectReplace<S, F, Fut, S::Ok>
where
    S: TryStream,
    F: FnMut(S::Ok, CancelHandle) -> Fut,
    Fut: TryFuture<Error = S::Error>,
{
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl<S, F, Fut, T> std::fmt::Debug for SelectReplace<S, F, Fut, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectReplace")
            .field("generation", &self.clock.current())
            .field("in_flight", &self.in_flight.is_some())
            .field("pending", &self.pending.len())
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}
