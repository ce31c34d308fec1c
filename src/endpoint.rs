//! Remote endpoint description and login parsing.

use crate::error::SyncError;

/// Where the master database lives.
///
/// Built once per run from user input (seeded with config defaults) and
/// immutable once a session has connected with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    pub username: String,
    pub hostname: String,
    /// Directory on the remote host holding the master.
    pub remote_dir: String,
    /// File name of the master database inside `remote_dir`.
    pub db_file: String,
}

impl RemoteEndpoint {
    /// Build an endpoint from a `user@host` login string.
    ///
    /// The login shape is validated here, before any network attempt.
    pub fn from_login(
        login: &str,
        remote_dir: impl Into<String>,
        db_file: impl Into<String>,
    ) -> Result<Self, SyncError> {
        let (username, hostname) = login
            .split_once('@')
            .ok_or_else(|| SyncError::InvalidLogin(login.to_string()))?;
        if username.is_empty() || hostname.is_empty() {
            return Err(SyncError::InvalidLogin(login.to_string()));
        }
        Ok(Self {
            username: username.to_string(),
            hostname: hostname.to_string(),
            remote_dir: remote_dir.into(),
            db_file: db_file.into(),
        })
    }

    /// Login string in `user@host` form, as remembered in the config.
    pub fn login(&self) -> String {
        format!("{}@{}", self.username, self.hostname)
    }

    /// Canonical path of the master database on the remote host.
    ///
    /// Joined with forward slashes regardless of the local platform;
    /// backslashes in a configured directory are normalized to the remote
    /// convention.
    pub fn master_path(&self) -> String {
        let dir = self.remote_dir.replace('\\', "/");
        if dir.is_empty() || dir.ends_with('/') {
            format!("{}{}", dir, self.db_file)
        } else {
            format!("{}/{}", dir, self.db_file)
        }
    }

    /// Path of the transient backup the publish protocol keeps next to the
    /// master while an upload is in flight.
    pub fn backup_path(&self) -> String {
        format!("{}.backup", self.master_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_login() {
        let ep = RemoteEndpoint::from_login("alice@garden.local", "/srv/garden", "garden_sensors.db")
            .unwrap();
        assert_eq!(ep.username, "alice");
        assert_eq!(ep.hostname, "garden.local");
        assert_eq!(ep.login(), "alice@garden.local");
    }

    #[test]
    fn rejects_login_without_at() {
        let err = RemoteEndpoint::from_login("alice", "/srv", "db").unwrap_err();
        assert!(matches!(err, SyncError::InvalidLogin(_)));
    }

    #[test]
    fn rejects_empty_login_parts() {
        assert!(RemoteEndpoint::from_login("@host", "/srv", "db").is_err());
        assert!(RemoteEndpoint::from_login("user@", "/srv", "db").is_err());
    }

    #[test]
    fn master_path_joins_with_forward_slash() {
        let ep = RemoteEndpoint::from_login("u@h", "/srv/garden", "garden_sensors.db").unwrap();
        assert_eq!(ep.master_path(), "/srv/garden/garden_sensors.db");
        assert_eq!(ep.backup_path(), "/srv/garden/garden_sensors.db.backup");
    }

    #[test]
    fn master_path_normalizes_backslashes() {
        let ep = RemoteEndpoint::from_login("u@h", r"garden\data", "g.db").unwrap();
        assert_eq!(ep.master_path(), "garden/data/g.db");
    }

    #[test]
    fn master_path_tolerates_trailing_slash() {
        let ep = RemoteEndpoint::from_login("u@h", "/srv/garden/", "g.db").unwrap();
        assert_eq!(ep.master_path(), "/srv/garden/g.db");
    }
}
