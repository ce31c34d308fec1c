//! Remote database synchronization for the garden tool suite.
//!
//! The tools that edit the shared garden database (photo compressor, schema
//! exporter, layout editor, plant identifier) all work on a local copy of a
//! master file kept on a remote host. This crate is the plumbing they share:
//! authenticated connections with bounded retry, fetching the master into an
//! ephemeral local cache, dirty tracking, and the backup/verify/rollback
//! publish protocol that pushes edits back to the master.
//!
//! The database contents are opaque bytes here. Tools open the cache file
//! with their own database access and call [`LocalCache::mark_changed`] after
//! each committed mutation; at save time they call [`SyncSession::publish`].

pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod progress;
pub mod publish;
pub mod remote;
pub mod session;
pub mod worker;

pub use cache::LocalCache;
pub use config::Config;
pub use endpoint::RemoteEndpoint;
pub use error::{SyncError, TransportError};
pub use progress::{NullProgress, ProgressObserver};
pub use publish::{PublishResult, RollbackOutcome};
pub use session::{PasswordSource, SyncSession};
