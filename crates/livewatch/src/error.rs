//! Error types for watching and live collections.
//!
//! This module contains the [`Error`] enum used by every fallible operation
//! in the crate. It integrates with [`miette`] for rich terminal diagnostics.
//!
//! # Error Variants
//!
//! | Variant | When It Occurs |
//! |---------|----------------|
//! | [`Error::WatcherInit`] | The OS watcher could not be created |
//! | [`Error::WatchPath`] | A path could not be registered with the watcher |
//! | [`Error::WatcherFault`] | The watcher failed after subscription (terminal) |
//! | [`Error::Scan`] | The initial directory enumeration failed |
//! | [`Error::Timeout`] | A deadline from [`crate::deadline`] expired |
//! | [`Error::Stopped`] | A command was sent to a stopped live folder |
//! | [`Error::Channel`] | An internal channel was disconnected |
//!
//! Cooperative cancellation is never reported through this type. Transforms
//! passed to [`select_replace`](crate::SelectReplaceExt::select_replace)
//! decide how a cancelled unit of work is represented, and their own faults
//! use the caller's error type.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error as ThisError;

/// Errors produced by watchers, scans and live folder handles.
///
/// Any error yielded by a notification stream is terminal: the stream ends
/// right after it and consumers must resubscribe to recover.
#[derive(Debug, ThisError, Diagnostic)]
#[non_exhaustive]
pub enum Error {
    /// Failed to initialize the OS watcher.
    #[error("failed to initialize file watcher: {message}")]
    #[diagnostic(
        code(livewatch::watcher_init),
        help("Check the platform watch limits (e.g. fs.inotify.max_user_instances)")
    )]
    WatcherInit {
        /// Human-readable error message.
        message: String,
        /// The underlying notify error, if available.
        #[source]
        source: Option<notify::Error>,
    },

    /// Failed to watch a specific path.
    #[error("failed to watch path '{}': {message}", path.display())]
    #[diagnostic(
        code(livewatch::watch_path),
        help("Ensure the directory is readable and not on an unsupported filesystem")
    )]
    WatchPath {
        /// The path that could not be watched.
        path: PathBuf,
        /// Human-readable error message.
        message: String,
    },

    /// The watcher reported a failure after the subscription was established.
    #[error("file watcher fault: {message}")]
    #[diagnostic(
        code(livewatch::watcher_fault),
        help("The subscription has ended. Subscribe again to resume watching.")
    )]
    WatcherFault {
        /// Human-readable error message.
        message: String,
        /// The underlying notify error, if available.
        #[source]
        source: Option<notify::Error>,
    },

    /// Enumerating a directory failed.
    #[error("failed to scan directory '{}'", path.display())]
    #[diagnostic(code(livewatch::scan_failed))]
    Scan {
        /// The directory being enumerated.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A unit of work did not finish before its deadline.
    #[error("{label} took longer than {}ms", after.as_millis())]
    #[diagnostic(code(livewatch::timeout))]
    Timeout {
        /// Label naming the unit of work.
        label: String,
        /// The deadline that expired.
        after: Duration,
    },

    /// The live folder has been stopped.
    #[error("live folder has been stopped")]
    #[diagnostic(
        code(livewatch::stopped),
        help("Build a new live folder if you need to continue watching")
    )]
    Stopped,

    /// Internal channel communication error.
    #[error("internal channel error: {message}")]
    #[diagnostic(code(livewatch::channel_error))]
    Channel {
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Create a new `WatcherInit` error.
    pub fn watcher_init(message: impl Into<String>, source: Option<notify::Error>) -> Self {
        Self::WatcherInit {
            message: message.into(),
            source,
        }
    }

    /// Create a new `WatchPath` error.
    pub fn watch_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::WatchPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new `WatcherFault` error.
    pub fn watcher_fault(message: impl Into<String>, source: Option<notify::Error>) -> Self {
        Self::WatcherFault {
            message: message.into(),
            source,
        }
    }

    /// Create a new `Scan` error.
    pub fn scan(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Scan {
            path: path.into(),
            source,
        }
    }

    /// Create a new `Timeout` error.
    pub fn timeout(label: impl Into<String>, after: Duration) -> Self {
        Self::Timeout {
            label: label.into(),
            after,
        }
    }

    /// Create a new `Channel` error.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
        }
    }

    /// Returns `true` if this error ends a notification stream.
    #[must_use]
    pub const fn is_watcher_fault(&self) -> bool {
        matches!(self, Self::WatcherFault { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
