//! Logging setup for the sync layer and its host tools.
//!
//! Uses systemd-journald when available on Linux, with a rolling file in the
//! config directory as the fallback everywhere else. Host tools with their
//! own tracing setup can skip this entirely; the library only emits events.

use anyhow::Result;
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Initialize logging with the default log directory.
///
/// Level is controlled through `GARDENSYNC_LOG` (`error`, `warn`, `info`,
/// `debug`, `trace`); `info` when unset.
pub fn init() -> Result<()> {
    init_at(Config::config_dir().join("logs"))
}

/// Initialize logging with an explicit fallback log directory.
pub fn init_at(log_dir: PathBuf) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_env("GARDENSYNC_LOG").unwrap_or_else(|_| EnvFilter::new("info"));

    #[cfg(target_os = "linux")]
    {
        if let Ok(journald_layer) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(journald_layer)
                .init();

            tracing::info!("Logging initialized with journald backend");
            return Ok(());
        }
    }

    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, "gardensync.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The worker guard has to outlive the process; init runs once, so parking
    // it in a static is enough.
    static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
        std::sync::OnceLock::new();
    let _ = GUARD.set(guard);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .init();

    tracing::info!("Logging initialized with file backend at {:?}", log_dir);
    Ok(())
}
