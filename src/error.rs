//! Error taxonomy for the synchronization layer.
//!
//! Transport errors describe a single remote filesystem operation; sync
//! errors describe the outcome of a whole workflow step. A missing remote
//! path is deliberately not an error at the fetch seam: `stat` reports it as
//! `None` and fetch responds by bootstrapping a fresh master.

use thiserror::Error;

/// Failure of one operation on the remote filesystem channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The endpoint rejected the supplied credentials.
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The host could not be reached or the channel could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The remote path does not exist.
    #[error("remote path not found: {0}")]
    NotFound(String),

    /// Local I/O failed while feeding or draining a transfer.
    #[error("transfer I/O error")]
    Io(#[from] std::io::Error),

    /// The remote side reported a protocol-level failure.
    #[error("remote operation failed: {0}")]
    Protocol(String),
}

/// Failure of a synchronization workflow step.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Every allowed authentication attempt was rejected, or the password
    /// source declined to supply another password.
    #[error("authentication failed after {attempts} attempt(s)")]
    Authentication { attempts: u32 },

    /// The remote host was unreachable. Never retried.
    #[error("could not connect to remote host")]
    Connection(#[source] TransportError),

    /// A login string without the `username@hostname` shape. Raised before
    /// any network attempt.
    #[error("login must be username@hostname, got {0:?}")]
    InvalidLogin(String),

    /// A transfer or remote operation failed mid-workflow.
    #[error("transfer failed")]
    Transfer(#[source] TransportError),

    /// The uploaded master does not match the local cache byte-for-byte in
    /// size, the only check the protocol performs.
    #[error("size mismatch after upload: remote {remote} bytes, local {local} bytes")]
    Verification { local: u64, remote: u64 },

    /// The local cache file could not be created or inspected.
    #[error("local cache error")]
    Cache(#[from] std::io::Error),

    /// The empty bootstrap database could not be created.
    #[error("could not create bootstrap database")]
    Bootstrap(#[from] rusqlite::Error),
}
