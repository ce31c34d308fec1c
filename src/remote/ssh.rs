//! SFTP-backed transport over libssh2.
//!
//! Password authentication only, matching how the tool suite is deployed;
//! key-based setups go straight through libssh2's agent support if the user
//! has one running, but that is the library's business, not ours.

use std::fs::File;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::path::Path;

use ssh2::{ErrorCode, RenameFlags, Session, Sftp};
use tracing::{debug, info};

use super::{Connector, RemoteFileInfo, RemoteTransport, TRANSFER_CHUNK};
use crate::endpoint::RemoteEndpoint;
use crate::error::TransportError;
use crate::progress::ProgressObserver;

/// The suite always talks to stock sshd on the standard port.
const SSH_PORT: u16 = 22;

/// libssh2 session error for a rejected authentication.
const LIBSSH2_ERROR_AUTHENTICATION_FAILED: i32 = -18;

/// SFTP status code for a missing remote path.
const SSH_FX_NO_SUCH_FILE: i32 = 2;

/// Connector that opens an SSH session and its SFTP subchannel.
pub struct SshConnector;

impl Connector for SshConnector {
    fn connect(
        &self,
        endpoint: &RemoteEndpoint,
        password: &str,
    ) -> Result<Box<dyn RemoteTransport>, TransportError> {
        let tcp = TcpStream::connect((endpoint.hostname.as_str(), SSH_PORT)).map_err(|e| {
            TransportError::Connection(format!("{}: {e}", endpoint.hostname))
        })?;

        let mut session =
            Session::new().map_err(|e| TransportError::Connection(e.to_string()))?;
        session.set_compress(true);
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        match session.userauth_password(&endpoint.username, password) {
            Ok(()) => {}
            Err(e) => {
                return Err(match e.code() {
                    ErrorCode::Session(LIBSSH2_ERROR_AUTHENTICATION_FAILED) => {
                        TransportError::Auth(e.message().to_string())
                    }
                    _ => TransportError::Connection(e.to_string()),
                });
            }
        }
        if !session.authenticated() {
            return Err(TransportError::Auth("authentication incomplete".to_string()));
        }

        let sftp = session
            .sftp()
            .map_err(|e| TransportError::Connection(e.to_string()))?;
        info!(host = %endpoint.hostname, user = %endpoint.username, "SSH session established");

        Ok(Box::new(SshTransport {
            session,
            sftp: Some(sftp),
        }))
    }
}

/// An open SSH session plus its SFTP channel.
pub struct SshTransport {
    session: Session,
    sftp: Option<Sftp>,
}

impl SshTransport {
    fn sftp(&self) -> Result<&Sftp, TransportError> {
        self.sftp
            .as_ref()
            .ok_or_else(|| TransportError::Protocol("file-transfer channel closed".to_string()))
    }
}

fn is_missing(e: &ssh2::Error) -> bool {
    matches!(e.code(), ErrorCode::SFTP(SSH_FX_NO_SUCH_FILE))
}

fn remote_err(e: ssh2::Error) -> TransportError {
    TransportError::Protocol(e.to_string())
}

impl RemoteTransport for SshTransport {
    fn stat(&mut self, path: &str) -> Result<Option<RemoteFileInfo>, TransportError> {
        match self.sftp()?.stat(Path::new(path)) {
            Ok(st) => Ok(Some(RemoteFileInfo {
                size: st.size.unwrap_or(0),
            })),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(remote_err(e)),
        }
    }

    fn download(
        &mut self,
        remote: &str,
        local: &Path,
        progress: &mut dyn ProgressObserver,
    ) -> Result<u64, TransportError> {
        let total = self
            .stat(remote)?
            .map(|info| info.size)
            .ok_or_else(|| TransportError::NotFound(remote.to_string()))?;

        let mut src = self.sftp()?.open(Path::new(remote)).map_err(remote_err)?;
        let mut dst = File::create(local)?;

        let mut buf = vec![0u8; TRANSFER_CHUNK];
        let mut transferred = 0u64;
        loop {
            let n = src.read(&mut buf)?;
            if n == 0 {
                break;
            }
            dst.write_all(&buf[..n])?;
            transferred += n as u64;
            progress.on_progress(transferred, total);
        }
        dst.flush()?;

        debug!(remote, transferred, "download complete");
        Ok(transferred)
    }

    fn upload(
        &mut self,
        local: &Path,
        remote: &str,
        progress: &mut dyn ProgressObserver,
    ) -> Result<u64, TransportError> {
        let total = std::fs::metadata(local)?.len();
        let mut src = File::open(local)?;
        let mut dst = self.sftp()?.create(Path::new(remote)).map_err(remote_err)?;

        let mut buf = vec![0u8; TRANSFER_CHUNK];
        let mut transferred = 0u64;
        loop {
            let n = src.read(&mut buf)?;
            if n == 0 {
                break;
            }
            dst.write_all(&buf[..n])?;
            transferred += n as u64;
            progress.on_progress(transferred, total);
        }

        debug!(remote, transferred, "upload complete");
        Ok(transferred)
    }

    fn rename(&mut self, from: &str, to: &str) -> Result<(), TransportError> {
        let flags = RenameFlags::OVERWRITE | RenameFlags::ATOMIC | RenameFlags::NATIVE;
        match self
            .sftp()?
            .rename(Path::new(from), Path::new(to), Some(flags))
        {
            Ok(()) => Ok(()),
            Err(e) if is_missing(&e) => Err(TransportError::NotFound(from.to_string())),
            Err(e) => Err(remote_err(e)),
        }
    }

    fn remove(&mut self, path: &str) -> Result<(), TransportError> {
        match self.sftp()?.unlink(Path::new(path)) {
            Ok(()) => Ok(()),
            Err(e) if is_missing(&e) => Err(TransportError::NotFound(path.to_string())),
            Err(e) => Err(remote_err(e)),
        }
    }

    fn close(&mut self) -> Result<(), TransportError> {
        // Drop the SFTP channel first; its shutdown happens on drop and
        // cannot block the session disconnect below.
        self.sftp.take();
        self.session
            .disconnect(None, "closing", None)
            .map_err(remote_err)
    }
}
