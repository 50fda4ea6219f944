//! Raw notification streams.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::channel::mpsc::{self, UnboundedReceiver};
use futures::stream::{FusedStream, Stream, StreamExt};

use super::backend::{NotificationItem, NotificationSink, WatcherFactory, WatcherHandle};
use super::types::{ChangeNotification, WatchScope};
use crate::error::{Error, Result};

/// Every change a watcher reports for one subscription, in delivery order.
///
/// The stream never ends on its own. It yields a terminal
/// [`Error::WatcherFault`] if the watcher fails, then ends. Dropping it
/// disposes the underlying watcher.
///
/// No scope filtering happens here: backends may report paths outside the
/// requested root, and consumers decide what to accept.
#[must_use = "streams do nothing unless polled"]
pub struct ChangeStream {
    scope: WatchScope,
    rx: UnboundedReceiver<NotificationItem>,
    handle: Option<WatcherHandle>,
}

impl ChangeStream {
    /// The scope this subscription was created for.
    #[must_use]
    pub const fn scope(&self) -> &WatchScope {
        &self.scope
    }

    fn close(&mut self) {
        if self.handle.take().is_some() {
            tracing::debug!(root = %self.scope.root, "watch.closed");
        }
        self.rx.close();
    }
}

/// Subscribe to `scope` through `factory`.
pub(crate) fn subscribe(factory: &dyn WatcherFactory, scope: WatchScope) -> Result<ChangeStream> {
    let (tx, rx) = mpsc::unbounded();
    let handle = factory.watch(&scope, NotificationSink::new(tx))?;
    tracing::debug!(root = %scope.root, recursive = scope.recursive, "watch.subscribed");

    Ok(ChangeStream {
        scope,
        rx,
        handle: Some(handle),
    })
}

impl Stream for ChangeStream {
    type Item = Result<ChangeNotification>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.handle.is_none() {
            return Poll::Ready(None);
        }

        match ready!(self.rx.poll_next_unpin(cx)) {
            Some(Ok(notification)) => {
                tracing::trace!(%notification, "watch.notification");
                Poll::Ready(Some(Ok(notification)))
            }
            Some(Err(err)) => {
                self.close();
                Poll::Ready(Some(Err(err)))
            }
            None => {
                self.close();
                Poll::Ready(Some(Err(Error::watcher_fault(
                    "watcher stopped delivering notifications",
                    None,
                ))))
            }
        }
    }
}

impl FusedStream for ChangeStream {
    fn is_terminated(&self) -> bool {
        self.handle.is_none()
    }
}

impl std::fmt::Debug for ChangeStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeStream")
            .field("scope", &self.scope)
            .field("active", &self.handle.is_some())
            .finish()
    }
}
