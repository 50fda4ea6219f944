//! Generation-scoped cooperative cancellation.

use std::future::Future;

use tokio_util::sync::{CancellationToken, DropGuard, WaitForCancellationFuture};

/// Monotonic generation counter owned by a single combinator.
#[derive(Debug, Default)]
pub(crate) struct GenerationClock {
    current: u64,
}

impl GenerationClock {
    /// Mints the next generation, starting at 1.
    pub fn next(&mut self) -> u64 {
        self.current = self.current.wrapping_add(1);
        self.current
    }

    /// The most recently minted generation (0 before the first).
    pub const fn current(&self) -> u64 {
        self.current
    }
}

/// Cancellation handle passed to each transform invocation.
///
/// Cancellation is a request: the transform decides whether to ignore it,
/// return a sentinel value, or fail. Cloning yields a handle observing the
/// same request.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    generation: u64,
    token: CancellationToken,
}

impl CancelHandle {
    pub(crate) fn new(generation: u64) -> Self {
        Self {
            generation,
            token: CancellationToken::new(),
        }
    }

    /// Generation this handle was minted for.
    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `true` once cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Future resolving when cancellation is requested.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// Runs `fut` until it completes or cancellation is requested.
    ///
    /// Returns `None` if cancellation won. A request that is already pending
    /// wins before `fut` is polled.
    pub async fn run_until_cancelled<F>(&self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        tokio::select! {
            biased;
            () = self.token.cancelled() => None,
            out = fut => Some(out),
        }
    }

    /// Token observing the same request, for APIs that take a
    /// [`CancellationToken`] directly.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub(crate) fn cancel(&self) {
        self.token.cancel();
    }

    pub(crate) fn drop_guard(&self) -> DropGuard {
        self.token.clone().drop_guard()
    }
}
