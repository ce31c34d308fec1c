//! Ephemeral local working copy of the master database.

use std::path::Path;

use rusqlite::Connection;
use tempfile::{Builder, TempPath};
use tracing::{debug, warn};

use crate::error::SyncError;

/// The local working copy of the master, plus the dirty flag that drives the
/// publish protocol.
///
/// The file lives in the OS temp directory under a process-unique name. The
/// owning tool opens it with its ordinary database access; this layer never
/// interprets the contents. The file is removed when the cache goes away,
/// published or not: unpublished edits are discarded by design, so tools
/// must publish before cleanup if they want them kept.
pub struct LocalCache {
    path: TempPath,
    dirty: bool,
}

impl LocalCache {
    /// Create the cache file, empty, ready to receive a download.
    pub(crate) fn create() -> Result<Self, SyncError> {
        let path = Builder::new()
            .prefix("gardensync-")
            .suffix(".db")
            .tempfile()?
            .into_temp_path();
        Ok(Self { path, dirty: false })
    }

    /// Create the cache as a fresh, valid, empty database (bootstrap).
    pub(crate) fn create_empty_db() -> Result<Self, SyncError> {
        let cache = Self::create()?;
        let conn = Connection::open(&cache.path)?;
        // A bare open leaves a zero-byte file; VACUUM forces the header out
        // so the uploaded bootstrap is a well-formed database.
        conn.execute_batch("VACUUM;")?;
        conn.close().map_err(|(_, e)| e)?;
        debug!(path = %cache.path.display(), "bootstrapped empty database");
        Ok(cache)
    }

    /// Path the owning tool opens with its own database access.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that the cache holds committed edits not yet on the master.
    ///
    /// Whole-file granularity: the layer does not know what changed, only
    /// that something did.
    pub fn mark_changed(&mut self) {
        self.dirty = true;
    }

    /// Whether unpublished edits exist.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Current byte size of the cache file.
    pub fn size_bytes(&self) -> Result<u64, SyncError> {
        Ok(std::fs::metadata(&self.path)?.len())
    }

    /// Delete the cache file now, logging rather than raising on failure.
    ///
    /// Dropping the cache removes the file too; this form exists so cleanup
    /// order is deterministic and deletion failures reach the log.
    pub fn cleanup(self) {
        if self.dirty {
            warn!("discarding local cache with unpublished edits");
        }
        let shown = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            warn!(path = %shown.display(), error = %e, "could not delete local cache");
        }
    }
}
