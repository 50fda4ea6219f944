//! Watcher capability and the `notify` backend.
//!
//! A [`WatcherFactory`] turns a [`WatchScope`] into a running watcher that
//! pushes raw changes into a [`NotificationSink`]. The sink normalizes every
//! reported path, so backends can hand over whatever the OS gives them.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use futures::channel::mpsc::UnboundedSender;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};

use super::types::{ChangeNotification, WatchScope};
use crate::error::{Error, Result};
use crate::path::NormalizedPath;

/// Item type carried from a watcher to its subscription.
pub(crate) type NotificationItem = Result<ChangeNotification>;

/// Write side of a subscription, handed to a watcher backend.
///
/// Sends never block. They report `false` once the subscription has been
/// dropped, which backends may use to stop early.
#[derive(Clone)]
pub struct NotificationSink {
    tx: UnboundedSender<NotificationItem>,
}

impl NotificationSink {
    pub(crate) const fn new(tx: UnboundedSender<NotificationItem>) -> Self {
        Self { tx }
    }

    /// Report that `path` was created.
    pub fn created(&self, path: impl AsRef<Path>) -> bool {
        self.send(ChangeNotification::created(NormalizedPath::new(path)))
    }

    /// Report that `path` was deleted.
    pub fn deleted(&self, path: impl AsRef<Path>) -> bool {
        self.send(ChangeNotification::deleted(NormalizedPath::new(path)))
    }

    /// Forward a notification.
    pub fn send(&self, notification: ChangeNotification) -> bool {
        self.tx.unbounded_send(Ok(notification)).is_ok()
    }

    /// Report a terminal watcher failure.
    pub fn fault(&self, error: Error) -> bool {
        tracing::warn!(error = %error, "watcher.fault");
        self.tx.unbounded_send(Err(error)).is_ok()
    }

    /// Returns `true` once the subscription is gone.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationSink")
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Keeps a backend watcher alive; dropping it disposes the watcher.
pub struct WatcherHandle {
    _inner: Box<dyn Send>,
}

impl WatcherHandle {
    /// Wrap whatever resource keeps the watcher running.
    pub fn new<T: Send + 'static>(inner: T) -> Self {
        Self {
            _inner: Box::new(inner),
        }
    }
}

impl fmt::Debug for WatcherHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatcherHandle").finish_non_exhaustive()
    }
}

/// Creates watchers for directories.
///
/// Implementations report created and deleted entries for `scope.root`
/// (and below it when `scope.recursive` is set). They may report more than
/// that; subscribers filter by scope themselves.
pub trait WatcherFactory: Send + Sync {
    /// Start watching `scope`, pushing changes into `sink`.
    ///
    /// A root that does not exist yet must not fail the call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WatcherInit`] or [`Error::WatchPath`] if the watcher
    /// cannot be set up.
    fn watch(&self, scope: &WatchScope, sink: NotificationSink) -> Result<WatcherHandle>;
}

impl<W: WatcherFactory + ?Sized> WatcherFactory for Arc<W> {
    fn watch(&self, scope: &WatchScope, sink: NotificationSink) -> Result<WatcherHandle> {
        (**self).watch(scope, sink)
    }
}

/// OS watcher backed by [`notify::RecommendedWatcher`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NotifyWatcherFactory;

impl WatcherFactory for NotifyWatcherFactory {
    fn watch(&self, scope: &WatchScope, sink: NotificationSink) -> Result<WatcherHandle> {
        let callback_sink = sink.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for notification in translate_event(&event) {
                    if !callback_sink.send(notification) {
                        break;
                    }
                }
            }
            Err(e) => {
                callback_sink.fault(Error::watcher_fault(e.to_string(), Some(e)));
            }
        })
        .map_err(|e| Error::watcher_init(format!("failed to create file watcher: {e}"), Some(e)))?;

        if !scope.root.as_path().is_dir() {
            tracing::warn!(root = %scope.root, "watch root does not exist, subscription stays silent");
            return Ok(WatcherHandle::new(watcher));
        }

        let mode = if scope.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher
            .watch(scope.root.as_path(), mode)
            .map_err(|e| Error::watch_path(scope.root.to_path_buf(), format!("failed to watch: {e}")))?;

        tracing::debug!(root = %scope.root, recursive = scope.recursive, "notify.watch");
        Ok(WatcherHandle::new(watcher))
    }
}

/// Map a notify event onto created/deleted notifications.
fn translate_event(event: &Event) -> Vec<ChangeNotification> {
    let paths = event.paths.iter();
    match event.kind {
        EventKind::Create(_) | EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            paths.map(ChangeNotification::created).collect()
        }
        EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            paths.map(ChangeNotification::deleted).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to] => vec![
                ChangeNotification::deleted(from),
                ChangeNotification::created(to),
            ],
            _ => Vec::new(),
        },
        // Backends that cannot tell rename direction: decide by presence.
        EventKind::Modify(ModifyKind::Name(_)) => paths
            .map(|p| {
                if p.exists() {
                    ChangeNotification::created(p)
                } else {
                    ChangeNotification::deleted(p)
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}
