use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub remote: RemoteConfig,
}

/// The `[remote]` section: connection details remembered from the last
/// successful connect, offered as prompt defaults on the next run.
///
/// There is no password field on purpose. Passwords are prompted on every
/// run and never written to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Last successful login as `user@host`.
    #[serde(default)]
    pub login: String,

    /// Last successful remote directory.
    #[serde(default)]
    pub dir: String,

    #[serde(default = "default_db_file")]
    pub db_file: String,
}

fn default_db_file() -> String {
    "garden_sensors.db".to_string()
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            login: String::new(),
            dir: String::new(),
            db_file: default_db_file(),
        }
    }
}

/// Where connection defaults are remembered after a successful connect.
///
/// [`Config`] persists them to the config file; tests and scripted callers
/// can substitute a store that keeps them elsewhere or nowhere.
pub trait SettingsStore {
    fn remember_remote(&mut self, login: &str, dir: &str);
}

/// A store that remembers nothing.
pub struct NoSettings;

impl SettingsStore for NoSettings {
    fn remember_remote(&mut self, _login: &str, _dir: &str) {}
}

impl SettingsStore for Config {
    fn remember_remote(&mut self, login: &str, dir: &str) {
        self.remote.login = login.to_string();
        self.remote.dir = dir.to_string();
        // Losing the defaults is an inconvenience, not a failure of the
        // connect that just succeeded.
        if let Err(e) = self.save() {
            warn!(error = %e, "could not persist connection defaults");
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            // Create default config
            let config = Config::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gardensync")
    }

    fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}
