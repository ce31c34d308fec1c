//! Worker-thread handoff for GUI-hosted tools.
//!
//! Every network call in this crate blocks. Tools with an event loop run the
//! connect/fetch/publish sequence on a dedicated thread through
//! [`run_in_background`], keeping their rendering loop responsive. Session
//! and cache ownership move into the worker and come back from
//! [`SyncWorker::join`]; while the worker runs, nothing else may touch them.
//! Progress crosses the thread boundary as plain immutable messages drained
//! by [`SyncWorker::poll`] on the owning thread's tick.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::progress::ProgressObserver;

/// Immutable progress message from the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferProgress {
    pub transferred: u64,
    pub total: u64,
}

/// Progress observer that forwards updates over a channel.
pub struct ChannelReporter {
    tx: Sender<TransferProgress>,
}

impl ProgressObserver for ChannelReporter {
    fn on_progress(&mut self, transferred: u64, total: u64) {
        // A disconnected receiver only means the owner stopped polling;
        // the transfer itself carries on.
        let _ = self.tx.send(TransferProgress { transferred, total });
    }
}

/// Handle to a sync sequence running on its own thread.
pub struct SyncWorker<T> {
    receiver: Receiver<TransferProgress>,
    handle: JoinHandle<T>,
}

impl<T> SyncWorker<T> {
    /// Drain the progress updates received since the last poll.
    pub fn poll(&self) -> Vec<TransferProgress> {
        let mut updates = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(update) => updates.push(update),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        updates
    }

    /// Whether the worker has finished and `join` will not block.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the worker completes and hand ownership back.
    pub fn join(self) -> T {
        match self.handle.join() {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Run a blocking sync sequence on a dedicated thread.
///
/// The closure gets a reporter wired to the returned handle. Move the
/// session and cache in, do the blocking work, and return them (plus any
/// result) back out through `join`.
pub fn run_in_background<T, F>(f: F) -> SyncWorker<T>
where
    T: Send + 'static,
    F: FnOnce(&mut ChannelReporter) -> T + Send + 'static,
{
    let (tx, receiver) = mpsc::channel();
    let handle = thread::spawn(move || {
        let mut reporter = ChannelReporter { tx };
        f(&mut reporter)
    });
    SyncWorker { receiver, handle }
}
