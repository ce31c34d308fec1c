//! One tool invocation's connection to the remote master.

use tracing::{info, warn};

use crate::cache::LocalCache;
use crate::config::SettingsStore;
use crate::endpoint::RemoteEndpoint;
use crate::error::{SyncError, TransportError};
use crate::progress::{NullProgress, ProgressObserver};
use crate::publish::{self, PublishResult, RollbackOutcome};
use crate::remote::{Connector, RemoteFileInfo, RemoteTransport};

/// Total authentication attempts before giving up.
const MAX_AUTH_ATTEMPTS: u32 = 3;

/// Supplies passwords for authentication attempts.
///
/// The first call happens before the first attempt; later calls are
/// re-prompts after a rejected password. Returning an empty string abandons
/// the remaining attempts.
pub trait PasswordSource {
    fn password(&mut self, attempt: u32) -> String;
}

impl<F: FnMut(u32) -> String> PasswordSource for F {
    fn password(&mut self, attempt: u32) -> String {
        self(attempt)
    }
}

/// An authenticated session against the host holding the master database.
///
/// Owns the transport for the lifetime of one tool invocation, and is never
/// shared: a network operation has the session to itself until it returns
/// (see [`crate::worker`] for the thread handoff GUI tools use). Dropping
/// the session closes the connection; [`SyncSession::cleanup`] does the same
/// with deterministic ordering plus cache removal.
pub struct SyncSession {
    transport: Option<Box<dyn RemoteTransport>>,
    endpoint: RemoteEndpoint,
    attempts: u32,
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("transport", &self.transport.as_ref().map(|_| "..."))
            .field("endpoint", &self.endpoint)
            .field("attempts", &self.attempts)
            .finish()
    }
}

impl SyncSession {
    /// Authenticate against the endpoint, with bounded retry on rejected
    /// passwords.
    ///
    /// Connectivity failures (host unreachable, channel refused) are
    /// terminal immediately; only a rejected password earns a re-prompt, up
    /// to [`MAX_AUTH_ATTEMPTS`] attempts total. On success the login and
    /// remote directory are remembered in `settings` as next run's defaults.
    pub fn connect(
        connector: &dyn Connector,
        endpoint: RemoteEndpoint,
        passwords: &mut dyn PasswordSource,
        settings: &mut dyn SettingsStore,
    ) -> Result<Self, SyncError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let password = passwords.password(attempt);
            if password.is_empty() {
                // An empty prompt is the user declining to continue.
                return Err(SyncError::Authentication {
                    attempts: attempt - 1,
                });
            }

            info!(host = %endpoint.hostname, attempt, max = MAX_AUTH_ATTEMPTS, "connecting");
            match connector.connect(&endpoint, &password) {
                Ok(transport) => {
                    settings.remember_remote(&endpoint.login(), &endpoint.remote_dir);
                    return Ok(Self {
                        transport: Some(transport),
                        endpoint,
                        attempts: attempt,
                    });
                }
                Err(TransportError::Auth(reason)) => {
                    warn!(attempt, %reason, "authentication rejected");
                    if attempt >= MAX_AUTH_ATTEMPTS {
                        return Err(SyncError::Authentication { attempts: attempt });
                    }
                }
                Err(e) => return Err(SyncError::Connection(e)),
            }
        }
    }

    pub fn endpoint(&self) -> &RemoteEndpoint {
        &self.endpoint
    }

    /// Authentication attempts the connect took.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Stat the master database without transferring it.
    pub fn master_info(&mut self) -> Result<Option<RemoteFileInfo>, SyncError> {
        let master = self.endpoint.master_path();
        self.transport()?.stat(&master).map_err(SyncError::Transfer)
    }

    /// Produce the local cache: download the master, or bootstrap one.
    ///
    /// When the master exists its full contents are downloaded with progress
    /// against the stat-reported size. When it does not, a fresh empty
    /// database is created locally and uploaded so both sides start from the
    /// same bytes; no download progress is emitted in that branch. Either
    /// way the returned cache is clean. On failure no partial cache escapes;
    /// the temp file is already gone.
    pub fn fetch(&mut self, reporter: &mut dyn ProgressObserver) -> Result<LocalCache, SyncError> {
        let master = self.endpoint.master_path();
        let transport = self.transport()?;

        match transport.stat(&master).map_err(SyncError::Transfer)? {
            Some(info) => {
                info!(path = %master, size = info.size, "downloading master");
                let cache = LocalCache::create()?;
                transport
                    .download(&master, cache.path(), reporter)
                    .map_err(SyncError::Transfer)?;
                Ok(cache)
            }
            None => {
                info!(path = %master, "no master on remote, bootstrapping");
                let cache = LocalCache::create_empty_db()?;
                transport
                    .upload(cache.path(), &master, &mut NullProgress)
                    .map_err(SyncError::Transfer)?;
                Ok(cache)
            }
        }
    }

    /// Run the publish protocol for the cache. See [`crate::publish`].
    pub fn publish(
        &mut self,
        cache: &mut LocalCache,
        reporter: &mut dyn ProgressObserver,
    ) -> PublishResult {
        let Self {
            transport, endpoint, ..
        } = self;
        match transport.as_deref_mut() {
            Some(t) => publish::run(t, endpoint, cache, reporter),
            None => PublishResult::Failed {
                error: SyncError::Transfer(TransportError::Protocol(
                    "session already closed".to_string(),
                )),
                rollback: RollbackOutcome::NotNeeded,
            },
        }
    }

    /// Deterministically release the session and, if given, the cache.
    ///
    /// Runs on every exit path of a well-behaved tool. Each step is
    /// best-effort and logged; the cache file is removed whether or not its
    /// edits were published.
    pub fn cleanup(mut self, cache: Option<LocalCache>) {
        self.close_transport();
        if let Some(cache) = cache {
            cache.cleanup();
        }
    }

    fn transport(&mut self) -> Result<&mut dyn RemoteTransport, SyncError> {
        match self.transport.as_deref_mut() {
            Some(t) => Ok(t),
            None => Err(SyncError::Transfer(TransportError::Protocol(
                "session already closed".to_string(),
            ))),
        }
    }

    fn close_transport(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!(error = %e, "error closing remote session");
            }
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        self.close_transport();
    }
}
