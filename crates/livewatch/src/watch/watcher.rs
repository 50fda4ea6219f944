//! Internal drain thread for live folders.
//!
//! This module contains the [`FolderWatcher`] which owns a folder
//! subscription, applies its updates to a [`SharedCollection`] and publishes
//! what it applied.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use futures::stream::{self, StreamExt};

use super::collection::LiveCollection;
use super::container::SharedCollection;
use super::context::WatchContext;
use super::folder::FolderContents;
use super::types::{CollectionUpdate, FolderEvent, WatchScope};
use crate::error::{Error, Result};
use crate::fs::FileSystem;

/// Commands sent to the drain thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchCommand {
    /// Re-enumerate the folder and reconcile the collection with it.
    Rescan,
    /// Stop watching.
    Stop,
}

/// Internal watcher state shared between threads.
pub(crate) struct WatcherState {
    /// The live collection.
    pub collection: Arc<SharedCollection>,
    /// The scope being watched.
    pub scope: WatchScope,
    /// Whether the drain thread is running.
    pub running: AtomicBool,
}

impl WatcherState {
    pub fn new(collection: Arc<SharedCollection>, scope: WatchScope) -> Self {
        Self {
            collection,
            scope,
            running: AtomicBool::new(true),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Configuration for the internal watcher.
pub(crate) struct WatcherConfig {
    /// What to watch.
    pub scope: WatchScope,
    /// Capacity of the event channel.
    pub channel_capacity: usize,
}

/// Owns the drain thread of one live folder.
pub(crate) struct FolderWatcher {
    /// Shared state.
    state: Arc<WatcherState>,
    /// Command sender for controlling the drain thread.
    command_tx: UnboundedSender<WatchCommand>,
    /// Receiver for published events.
    event_rx: Receiver<FolderEvent>,
    /// Drain thread handle.
    thread_handle: Option<JoinHandle<()>>,
}

impl FolderWatcher {
    /// Subscribe, apply the initial scan, and start the drain thread.
    ///
    /// The initial scan is applied before this returns, without bumping the
    /// epoch or publishing events. Rescans list the resolved root the
    /// subscription was made on.
    pub fn start(ctx: &WatchContext, config: WatcherConfig) -> Result<Self> {
        let mut contents = ctx.watch_folder_contents_in(config.scope)?;
        let scope = contents.scope().clone();
        let initial: LiveCollection = contents.drain_initial().collect();
        tracing::debug!(root = %scope.root, files = initial.len(), "live_folder.initial");

        let collection = Arc::new(SharedCollection::new(initial));
        let state = Arc::new(WatcherState::new(collection, scope));

        let (command_tx, command_rx) = mpsc::unbounded::<WatchCommand>();
        let (event_tx, event_rx) = bounded::<FolderEvent>(config.channel_capacity);

        let thread_state = state.clone();
        let fs = ctx.file_system().clone();
        let events = Events {
            tx: event_tx,
            rx: event_rx.clone(),
        };
        let thread_handle = thread::Builder::new()
            .name("livewatch-folder".to_string())
            .spawn(move || {
                futures::executor::block_on(drain_loop(
                    &thread_state,
                    fs.as_ref(),
                    contents,
                    command_rx,
                    &events,
                ));
            })
            .map_err(|e| Error::watcher_init(format!("failed to spawn watcher thread: {e}"), None))?;

        Ok(Self {
            state,
            command_tx,
            event_rx,
            thread_handle: Some(thread_handle),
        })
    }

    /// The live collection.
    pub fn collection(&self) -> &Arc<SharedCollection> {
        &self.state.collection
    }

    /// The scope being watched.
    pub fn scope(&self) -> &WatchScope {
        &self.state.scope
    }

    /// Request a rescan.
    pub fn request_rescan(&self) -> Result<()> {
        if !self.state.is_running() {
            return Err(Error::Stopped);
        }
        self.command_tx
            .unbounded_send(WatchCommand::Rescan)
            .map_err(|_| Error::channel("failed to send rescan command"))
    }

    /// Stop the drain thread.
    pub fn stop(&self) {
        self.state.stop();
        let _ = self.command_tx.unbounded_send(WatchCommand::Stop);
    }

    /// Get the event receiver.
    pub fn event_receiver(&self) -> &Receiver<FolderEvent> {
        &self.event_rx
    }

    /// Check if the drain thread is still running.
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

impl Drop for FolderWatcher {
    fn drop(&mut self) {
        self.stop();
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Both ends of the event channel, as seen by the drain thread.
///
/// The receiver is only used to evict a stale update when an error event
/// must be delivered into a full channel.
struct Events {
    tx: Sender<FolderEvent>,
    rx: Receiver<FolderEvent>,
}

impl Events {
    /// Publish without blocking the drain thread. Updates are dropped when
    /// no one keeps up with the channel.
    fn update(&self, update: CollectionUpdate) {
        match self.tx.try_send(FolderEvent::Updated(update)) {
            Ok(()) | Err(TrySendError::Disconnected(_)) => {}
            Err(TrySendError::Full(event)) => {
                tracing::trace!(?event, "live_folder.event_dropped");
            }
        }
    }

    /// Publish an error event, evicting the oldest queued event while the
    /// channel is full. Never blocks and never drops `event`.
    fn error(&self, mut event: FolderEvent) {
        loop {
            match self.tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    event = back;
                    if let Ok(evicted) = self.rx.try_recv() {
                        tracing::trace!(?evicted, "live_folder.event_evicted");
                    }
                }
            }
        }
    }
}

enum Input {
    Update(Result<CollectionUpdate>),
    Command(WatchCommand),
}

/// Main loop running on the drain thread.
async fn drain_loop(
    state: &WatcherState,
    fs: &dyn FileSystem,
    contents: FolderContents,
    command_rx: UnboundedReceiver<WatchCommand>,
    events: &Events,
) {
    // A dropped command sender means the owner is gone.
    let commands = command_rx
        .map(Input::Command)
        .chain(stream::iter([Input::Command(WatchCommand::Stop)]));
    let mut inputs = stream::select(contents.map(Input::Update), commands);

    while let Some(input) = inputs.next().await {
        match input {
            Input::Update(Ok(update)) => {
                if state.collection.apply(&update) {
                    events.update(update);
                }
            }
            Input::Update(Err(err)) => {
                state.stop();
                tracing::warn!(error = %err, root = %state.scope.root, "live_folder.faulted");
                events.error(FolderEvent::Faulted(err));
                break;
            }
            Input::Command(WatchCommand::Rescan) => rescan(state, fs, events),
            Input::Command(WatchCommand::Stop) => {
                state.stop();
                break;
            }
        }
    }

    state.stop();
    tracing::debug!(root = %state.scope.root, "live_folder.stopped");
}

/// Re-enumerate the folder and apply the difference.
fn rescan(state: &WatcherState, fs: &dyn FileSystem, events: &Events) {
    let listing = match fs.list_files(&state.scope.root, state.scope.recursive) {
        Ok(listing) => listing,
        Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            let err = Error::scan(state.scope.root.to_path_buf(), e);
            tracing::warn!(error = %err, "live_folder.rescan_failed");
            events.error(FolderEvent::RescanFailed(err));
            return;
        }
    };

    let updates = state.collection.read(|c| c.reconcile(&listing));
    tracing::debug!(root = %state.scope.root, changes = updates.len(), "live_folder.rescanned");
    for update in updates {
        if state.collection.apply(&update) {
            events.update(update);
        }
    }
}
