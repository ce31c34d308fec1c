//! Transfer progress reporting.

/// Observer for byte-level transfer progress.
///
/// Invoked with the running transferred count and the total expected bytes,
/// once per transfer chunk. Callers map the updates into whatever
/// presentation they use (console bar, dialog, nothing at all). A transfer
/// with nothing to move may never invoke the observer, so consumers must
/// handle the zero-progress case.
pub trait ProgressObserver {
    fn on_progress(&mut self, transferred: u64, total: u64);
}

/// Observer that discards every update.
pub struct NullProgress;

impl ProgressObserver for NullProgress {
    fn on_progress(&mut self, _transferred: u64, _total: u64) {}
}

impl<F: FnMut(u64, u64)> ProgressObserver for F {
    fn on_progress(&mut self, transferred: u64, total: u64) {
        self(transferred, total)
    }
}
