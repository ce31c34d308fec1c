//! The sync-back protocol: backup, upload, verify, then cleanup or rollback.
//!
//! The upload overwrites the master in place, so the backup protects against
//! an upload that verifies bad, not against a crash mid-transfer. Hardening
//! that (upload to a side path, then rename) would change the remote layout
//! every consumer knows, so the in-place behavior stays.

use tracing::{debug, error, info, warn};

use crate::cache::LocalCache;
use crate::endpoint::RemoteEndpoint;
use crate::error::{SyncError, TransportError};
use crate::progress::ProgressObserver;
use crate::remote::RemoteTransport;

/// What happened to the remote master after a failed upload or verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The master was never touched; nothing to roll back.
    NotNeeded,
    /// No backup existed to restore (the master was already gone when
    /// publishing started).
    NoBackup,
    /// The backup was renamed back over the master.
    Restored,
    /// The backup could not be restored. The master needs manual attention.
    RestoreFailed(String),
}

/// Outcome of one publish attempt.
#[derive(Debug)]
pub enum PublishResult {
    /// The cache was clean; no network traffic happened.
    NoOp,
    /// The master now matches the cache and the dirty flag was cleared.
    Published { bytes: u64 },
    /// The upload did not take. The dirty flag is still set so the caller
    /// can retry (or knowingly discard the edits at cleanup).
    Failed {
        error: SyncError,
        rollback: RollbackOutcome,
    },
}

impl PublishResult {
    pub fn is_success(&self) -> bool {
        matches!(self, PublishResult::NoOp | PublishResult::Published { .. })
    }
}

pub(crate) fn run(
    transport: &mut dyn RemoteTransport,
    endpoint: &RemoteEndpoint,
    cache: &mut LocalCache,
    reporter: &mut dyn ProgressObserver,
) -> PublishResult {
    if !cache.is_dirty() {
        debug!("cache is clean, nothing to publish");
        return PublishResult::NoOp;
    }

    let master = endpoint.master_path();
    let backup = endpoint.backup_path();

    // Set the current master aside. A missing master is survivable (deleted
    // out-of-band since fetch); any other rename failure aborts before the
    // master has been touched.
    let have_backup = match transport.rename(&master, &backup) {
        Ok(()) => true,
        Err(TransportError::NotFound(_)) => {
            warn!(path = %master, "master missing on remote, publishing without a backup");
            false
        }
        Err(e) => {
            error!(error = %e, "could not set aside the current master");
            return PublishResult::Failed {
                error: SyncError::Transfer(e),
                rollback: RollbackOutcome::NotNeeded,
            };
        }
    };

    match upload_and_verify(transport, &master, cache, reporter) {
        Ok(bytes) => {
            if have_backup {
                // The backup is transient; leaving one behind is logged, not
                // escalated, and does not change the verified result.
                if let Err(e) = transport.remove(&backup) {
                    warn!(path = %backup, error = %e, "could not delete publish backup");
                }
            }
            cache.clear_dirty();
            info!(path = %master, bytes, "publish verified");
            PublishResult::Published { bytes }
        }
        Err(err) => {
            let rollback = if have_backup {
                match transport.rename(&backup, &master) {
                    Ok(()) => {
                        info!(path = %master, "restored master from backup");
                        RollbackOutcome::Restored
                    }
                    Err(e) => {
                        error!(
                            path = %backup,
                            error = %e,
                            "backup restore failed, manual intervention required"
                        );
                        RollbackOutcome::RestoreFailed(e.to_string())
                    }
                }
            } else {
                RollbackOutcome::NoBackup
            };
            PublishResult::Failed {
                error: err,
                rollback,
            }
        }
    }
}

fn upload_and_verify(
    transport: &mut dyn RemoteTransport,
    master: &str,
    cache: &LocalCache,
    reporter: &mut dyn ProgressObserver,
) -> Result<u64, SyncError> {
    let local_size = cache.size_bytes()?;
    let bytes = transport
        .upload(cache.path(), master, reporter)
        .map_err(SyncError::Transfer)?;

    // Size equality is the whole verification; the file is opaque bytes at
    // this layer, so there is nothing smarter to compare without reading the
    // upload back.
    match transport.stat(master) {
        Ok(Some(info)) if info.size == local_size => Ok(bytes),
        Ok(Some(info)) => Err(SyncError::Verification {
            local: local_size,
            remote: info.size,
        }),
        Ok(None) => Err(SyncError::Verification {
            local: local_size,
            remote: 0,
        }),
        Err(e) => Err(SyncError::Transfer(e)),
    }
}
