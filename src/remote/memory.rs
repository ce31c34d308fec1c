//! In-process transport over a shared in-memory host.
//!
//! A [`MemoryHost`] stands in for the remote filesystem and a
//! [`MemoryConnector`] authenticates against a fixed password. The fault
//! switches emulate the transfer failures the publish protocol has to
//! survive, so the whole backup/verify/rollback path is exercisable without
//! a network.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Connector, RemoteFileInfo, RemoteTransport, TRANSFER_CHUNK};
use crate::endpoint::RemoteEndpoint;
use crate::error::TransportError;
use crate::progress::ProgressObserver;

#[derive(Default)]
struct HostState {
    files: HashMap<String, Vec<u8>>,
    operations: u64,
    truncate_uploads_to: Option<u64>,
    fail_uploads: bool,
    fail_renames: bool,
}

/// A fake remote filesystem shared by every transport cloned from it.
#[derive(Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<HostState>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HostState> {
        self.state.lock().expect("memory host lock poisoned")
    }

    /// Seed a file on the host.
    pub fn insert(&self, path: &str, bytes: Vec<u8>) {
        self.lock().files.insert(path.to_string(), bytes);
    }

    /// Current bytes of a hosted file, if present.
    pub fn bytes(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().files.get(path).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().files.contains_key(path)
    }

    /// Number of transport operations performed against this host.
    pub fn operation_count(&self) -> u64 {
        self.lock().operations
    }

    /// Store only the first `n` bytes of subsequent uploads while reporting
    /// full transfer, emulating a remote write that silently came up short.
    pub fn truncate_uploads_to(&self, n: Option<u64>) {
        self.lock().truncate_uploads_to = n;
    }

    /// Make subsequent uploads fail outright.
    pub fn fail_uploads(&self, fail: bool) {
        self.lock().fail_uploads = fail;
    }

    /// Make subsequent renames fail outright.
    pub fn fail_renames(&self, fail: bool) {
        self.lock().fail_renames = fail;
    }
}

/// Connector that authenticates against a fixed password.
pub struct MemoryConnector {
    host: MemoryHost,
    password: String,
}

impl MemoryConnector {
    pub fn new(host: MemoryHost, password: impl Into<String>) -> Self {
        Self {
            host,
            password: password.into(),
        }
    }
}

impl Connector for MemoryConnector {
    fn connect(
        &self,
        _endpoint: &RemoteEndpoint,
        password: &str,
    ) -> Result<Box<dyn RemoteTransport>, TransportError> {
        if password != self.password {
            return Err(TransportError::Auth("password rejected".to_string()));
        }
        Ok(Box::new(MemoryTransport {
            host: self.host.clone(),
            closed: false,
        }))
    }
}

/// Transport view onto a [`MemoryHost`].
pub struct MemoryTransport {
    host: MemoryHost,
    closed: bool,
}

impl MemoryTransport {
    fn guard_open(&self) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Protocol(
                "file-transfer channel closed".to_string(),
            ));
        }
        Ok(())
    }
}

impl RemoteTransport for MemoryTransport {
    fn stat(&mut self, path: &str) -> Result<Option<RemoteFileInfo>, TransportError> {
        self.guard_open()?;
        let mut state = self.host.lock();
        state.operations += 1;
        Ok(state.files.get(path).map(|bytes| RemoteFileInfo {
            size: bytes.len() as u64,
        }))
    }

    fn download(
        &mut self,
        remote: &str,
        local: &Path,
        progress: &mut dyn ProgressObserver,
    ) -> Result<u64, TransportError> {
        self.guard_open()?;
        let data = {
            let mut state = self.host.lock();
            state.operations += 1;
            state
                .files
                .get(remote)
                .cloned()
                .ok_or_else(|| TransportError::NotFound(remote.to_string()))?
        };

        std::fs::write(local, &data)?;

        let total = data.len() as u64;
        let mut transferred = 0u64;
        for chunk in data.chunks(TRANSFER_CHUNK) {
            transferred += chunk.len() as u64;
            progress.on_progress(transferred, total);
        }
        Ok(transferred)
    }

    fn upload(
        &mut self,
        local: &Path,
        remote: &str,
        progress: &mut dyn ProgressObserver,
    ) -> Result<u64, TransportError> {
        self.guard_open()?;
        let data = std::fs::read(local)?;

        {
            let mut state = self.host.lock();
            state.operations += 1;
            if state.fail_uploads {
                return Err(TransportError::Protocol("injected upload failure".to_string()));
            }
            let stored = match state.truncate_uploads_to {
                Some(n) => data[..data.len().min(n as usize)].to_vec(),
                None => data.clone(),
            };
            state.files.insert(remote.to_string(), stored);
        }

        // The sender's view: every byte went out, whatever the host kept.
        let total = data.len() as u64;
        let mut transferred = 0u64;
        for chunk in data.chunks(TRANSFER_CHUNK) {
            transferred += chunk.len() as u64;
            progress.on_progress(transferred, total);
        }
        Ok(total)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        self.guard_open()?;
        let mut state = self.host.lock();
        state.operations += 1;
        if state.fail_renames {
            return Err(TransportError::Protocol("injected rename failure".to_string()));
        }
        match state.files.remove(from) {
            Some(bytes) => {
                state.files.insert(to.to_string(), bytes);
                Ok(())
            }
            None => Err(TransportError::NotFound(from.to_string())),
        }
    }

    fn remove(&mut self, path: &str) -> Result<(), TransportError> {
        self.guard_open()?;
        let mut state = self.host.lock();
        state.operations += 1;
        match state.files.remove(path) {
            Some(_) => Ok(()),
            None => Err(TransportError::NotFound(path.to_string())),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NullProgress;

    fn endpoint() -> RemoteEndpoint {
        RemoteEndpoint::from_login("alice@garden.local", "/srv/garden", "garden_sensors.db")
            .unwrap()
    }

    #[test]
    fn connector_checks_password() {
        let host = MemoryHost::new();
        let connector = MemoryConnector::new(host, "secret");

        assert!(matches!(
            connector.connect(&endpoint(), "wrong"),
            Err(TransportError::Auth(_))
        ));
        assert!(connector.connect(&endpoint(), "secret").is_ok());
    }

    #[test]
    fn download_reports_chunked_progress() {
        let host = MemoryHost::new();
        host.insert("/srv/db", vec![7u8; TRANSFER_CHUNK * 2 + 10]);
        let connector = MemoryConnector::new(host, "pw");
        let mut transport = connector.connect(&endpoint(), "pw").unwrap();

        let local = tempfile::NamedTempFile::new().unwrap();
        let mut updates = Vec::new();
        let transferred = transport
            .download("/srv/db", local.path(), &mut |t: u64, total: u64| {
                updates.push((t, total))
            })
            .unwrap();

        let total = (TRANSFER_CHUNK * 2 + 10) as u64;
        assert_eq!(transferred, total);
        assert_eq!(updates.len(), 3);
        assert_eq!(updates.last(), Some(&(total, total)));
        assert_eq!(std::fs::read(local.path()).unwrap().len() as u64, total);
    }

    #[test]
    fn truncated_upload_keeps_short_bytes_but_reports_full_send() {
        let host = MemoryHost::new();
        host.truncate_uploads_to(Some(4));
        let connector = MemoryConnector::new(host.clone(), "pw");
        let mut transport = connector.connect(&endpoint(), "pw").unwrap();

        let local = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(local.path(), b"0123456789").unwrap();

        let sent = transport
            .upload(local.path(), "/srv/db", &mut NullProgress)
            .unwrap();
        assert_eq!(sent, 10);
        assert_eq!(host.bytes("/srv/db").unwrap(), b"0123");
    }

    #[test]
    fn rename_moves_and_missing_source_is_not_found() {
        let host = MemoryHost::new();
        host.insert("/a", b"x".to_vec());
        let connector = MemoryConnector::new(host.clone(), "pw");
        let mut transport = connector.connect(&endpoint(), "pw").unwrap();

        transport.rename("/a", "/b").unwrap();
        assert!(!host.contains("/a"));
        assert!(host.contains("/b"));

        assert!(matches!(
            transport.rename("/a", "/c"),
            Err(TransportError::NotFound(_))
        ));
    }

    #[test]
    fn closed_transport_rejects_operations() {
        let host = MemoryHost::new();
        let connector = MemoryConnector::new(host, "pw");
        let mut transport = connector.connect(&endpoint(), "pw").unwrap();

        transport.close().unwrap();
        assert!(transport.stat("/srv/db").is_err());
    }
}
