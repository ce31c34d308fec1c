//! Transport seam for the remote host.
//!
//! The synchronization layer treats the remote session as an opaque
//! capability: authenticate, stat, download with progress, upload with
//! progress, rename, remove. [`ssh`] provides the production SFTP-backed
//! implementation; [`memory`] provides an in-process host used by the test
//! suite and by offline tooling.

pub mod memory;
pub mod ssh;

use std::path::Path;

use crate::endpoint::RemoteEndpoint;
use crate::error::TransportError;
use crate::progress::ProgressObserver;

/// Transfer buffer size. Progress observers fire roughly once per chunk.
pub(crate) const TRANSFER_CHUNK: usize = 32 * 1024;

/// Metadata for a remote file, as much as the transport reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteFileInfo {
    pub size: u64,
}

/// One authenticated file-transfer channel to the remote host.
///
/// All operations block; a session issues at most one at a time.
pub trait RemoteTransport: Send {
    /// Stat a remote path. `Ok(None)` means the path does not exist.
    fn stat(&mut self, path: &str) -> Result<Option<RemoteFileInfo>, TransportError>;

    /// Download a remote file into `local`, reporting progress against the
    /// stat-reported total. Returns the bytes transferred.
    fn download(
        &mut self,
        remote: &str,
        local: &Path,
        progress: &mut dyn ProgressObserver,
    ) -> Result<u64, TransportError>;

    /// Upload a local file over `remote`, replacing it in place, reporting
    /// progress against the local byte size. Returns the bytes transferred.
    fn upload(
        &mut self,
        local: &Path,
        remote: &str,
        progress: &mut dyn ProgressObserver,
    ) -> Result<u64, TransportError>;

    /// Rename a remote path, replacing any existing target.
    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError>;

    /// Remove a remote file.
    fn remove(&mut self, path: &str) -> Result<(), TransportError>;

    /// Close the transfer channel and the underlying connection.
    ///
    /// Called once during cleanup. Implementations release the layers
    /// independently so a failure in one does not leak the other.
    fn close(&mut self) -> Result<(), TransportError>;
}

/// Produces authenticated transports, one connection attempt per call.
///
/// A rejected password comes back as [`TransportError::Auth`]; anything else
/// is a connectivity failure the caller must not retry.
pub trait Connector {
    fn connect(
        &self,
        endpoint: &RemoteEndpoint,
        password: &str,
    ) -> Result<Box<dyn RemoteTransport>, TransportError>;
}
