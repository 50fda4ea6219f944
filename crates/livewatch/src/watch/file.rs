//! Signals for the creation of a single file.

use std::pin::Pin;
use std::task::{Context, Poll, ready};

use futures::stream::{FusedStream, Stream, StreamExt};

use super::backend::WatcherFactory;
use super::source::{self, ChangeStream};
use super::types::{ChangeKind, WatchScope};
use crate::error::{Error, Result};
use crate::path::NormalizedPath;

/// Yields `()` each time the target file is created.
///
/// Only creation is reported; deletes and every other path in the parent
/// directory are ignored. The stream does not check whether the file
/// already exists when the subscription starts.
#[must_use = "streams do nothing unless polled"]
pub struct FileSignals {
    target: NormalizedPath,
    changes: ChangeStream,
    terminated: bool,
}

impl FileSignals {
    /// The file being watched.
    #[must_use]
    pub const fn target(&self) -> &NormalizedPath {
        &self.target
    }
}

/// Watch the parent directory of `target` for its creation.
pub(crate) fn subscribe(watcher: &dyn WatcherFactory, target: NormalizedPath) -> Result<FileSignals> {
    let Some(parent) = target.parent() else {
        return Err(Error::watch_path(
            target.to_path_buf(),
            "path has no parent directory",
        ));
    };

    let changes = source::subscribe(watcher, WatchScope::direct(parent))?;
    Ok(FileSignals {
        target,
        changes,
        terminated: false,
    })
}

impl Stream for FileSignals {
    type Item = Result<()>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.terminated {
            return Poll::Ready(None);
        }

        loop {
            match ready!(self.changes.poll_next_unpin(cx)) {
                Some(Ok(n)) if n.kind == ChangeKind::Created && n.path == self.target => {
                    tracing::debug!(target_path = %self.target, "file.created");
                    return Poll::Ready(Some(Ok(())));
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    self.terminated = true;
                    return Poll::Ready(Some(Err(err)));
                }
                None => {
                    self.terminated = true;
                    return Poll::Ready(None);
                }
            }
        }
    }
}

impl FusedStream for FileSignals {
    fn is_terminated(&self) -> bool {
        self.terminated
    }
}

impl std::fmt::Debug for FileSignals {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSignals")
            .field("target", &self.target)
            .field("terminated", &self.terminated)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryWatcherFactory;
    use futures::FutureExt;

    #[test]
    fn test_watches_parent_directory() {
        let watcher = MemoryWatcherFactory::new();
        let signals = subscribe(&watcher, NormalizedPath::new("/a/b/c.txt")).unwrap();
        assert_eq!(watcher.scopes(), vec![WatchScope::direct("/a/b")]);
        assert_eq!(signals.target().as_str(), "/a/b/c.txt");
    }

    #[test]
    fn test_only_target_creation_signals() {
        let watcher = MemoryWatcherFactory::new();
        let mut signals = subscribe(&watcher, NormalizedPath::new("/a/b/c.txt")).unwrap();

        watcher.mark_created("/a/b/other.txt");
        watcher.mark_deleted("/a/b/c.txt");
        assert!(signals.next().now_or_never().is_none());

        watcher.mark_created("/a/b/c.txt");
        assert!(matches!(signals.next().now_or_never(), Some(Some(Ok(())))));
    }

    #[test]
    fn test_root_has_no_parent() {
        let watcher = MemoryWatcherFactory::new();
        let err = subscribe(&watcher, NormalizedPath::new("/")).unwrap_err();
        assert!(err.to_string().contains("no parent"));
        assert_eq!(watcher.subscriptions(), 0);
    }
}
