use anyhow::{bail, Context, Result};
use std::io::{self, Write};
use std::path::PathBuf;

use gardensync::config::Config;
use gardensync::endpoint::RemoteEndpoint;
use gardensync::progress::ProgressObserver;
use gardensync::remote::ssh::SshConnector;
use gardensync::session::{PasswordSource, SyncSession};
use gardensync::{logging, PublishResult, RollbackOutcome};

enum Command {
    /// Stat the master without transferring it.
    Check,
    /// Download the master to a local path.
    Pull { out: PathBuf },
    /// Replace the master with a local file, with backup/verify/rollback.
    Push { input: PathBuf },
}

fn parse_args() -> (Option<PathBuf>, Command) {
    let args: Vec<String> = std::env::args().collect();
    let mut config_path = None;
    let mut positional = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("gardensync {}", env!("CARGO_PKG_VERSION"));
                std::process::exit(0);
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                } else {
                    eprintln!("Error: --config requires a path argument");
                    std::process::exit(1);
                }
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown argument: {other}");
                print_help();
                std::process::exit(1);
            }
            other => positional.push(other.to_string()),
        }
        i += 1;
    }

    let command = match positional.first().map(String::as_str) {
        Some("check") => Command::Check,
        Some("pull") => match positional.get(1) {
            Some(out) => Command::Pull {
                out: PathBuf::from(out),
            },
            None => {
                eprintln!("Error: pull requires an output path");
                std::process::exit(1);
            }
        },
        Some("push") => match positional.get(1) {
            Some(input) => Command::Push {
                input: PathBuf::from(input),
            },
            None => {
                eprintln!("Error: push requires an input path");
                std::process::exit(1);
            }
        },
        Some(other) => {
            eprintln!("Unknown command: {other}");
            print_help();
            std::process::exit(1);
        }
        None => {
            print_help();
            std::process::exit(1);
        }
    };

    (config_path, command)
}

fn print_help() {
    println!(
        r#"gardensync - remote master database utility for the garden tools

USAGE:
    gardensync [OPTIONS] <COMMAND>

COMMANDS:
    check         Show whether the master exists on the remote and its size
    pull PATH     Download the master database to PATH
    push PATH     Publish PATH as the new master (backup/verify/rollback)

OPTIONS:
    --config, -c PATH   Path to config file
    --version, -V       Show version
    --help, -h          Show this help message

ENVIRONMENT:
    GARDENSYNC_LOG      Log level (trace, debug, info, warn, error)

Config file location: $XDG_CONFIG_HOME/gardensync/config.toml"#
    );
}

/// Console progress bar fed by the transfer observer.
#[derive(Default)]
struct ConsoleBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressObserver for ConsoleBar {
    fn on_progress(&mut self, transferred: u64, total: u64) {
        let bar = self.bar.get_or_insert_with(|| {
            let pb = indicatif::ProgressBar::new(total);
            pb.set_style(
                indicatif::ProgressStyle::default_bar()
                    .template("{msg:>12} [{bar:30.cyan/dim}] {bytes}/{total_bytes}")
                    .expect("valid template")
                    .progress_chars("=> "),
            );
            pb.set_message("Transferring");
            pb
        });
        bar.set_position(transferred);
        if transferred >= total {
            bar.finish();
        }
    }
}

/// Masked password prompts, re-prompting on rejected attempts.
struct PromptPasswords;

impl PasswordSource for PromptPasswords {
    fn password(&mut self, attempt: u32) -> String {
        let label = if attempt == 1 {
            "Password: ".to_string()
        } else {
            format!("Password (attempt {attempt}/3): ")
        };
        rpassword::prompt_password(label).unwrap_or_default()
    }
}

fn prompt(label: &str, default: &str) -> Result<String> {
    if default.is_empty() {
        print!("{label}: ");
    } else {
        print!("{label} [{default}]: ");
    }
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    let line = line.trim();
    Ok(if line.is_empty() {
        default.to_string()
    } else {
        line.to_string()
    })
}

fn main() -> Result<()> {
    let (config_path, command) = parse_args();

    let _ = logging::init();

    let mut config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    let login = prompt("Login (user@host)", &config.remote.login)?;
    if login.is_empty() {
        bail!("login is required");
    }
    let dir = prompt("Remote directory", &config.remote.dir)?;
    if dir.is_empty() {
        bail!("remote directory is required");
    }
    let db_file = prompt("Database file", &config.remote.db_file)?;

    let endpoint = RemoteEndpoint::from_login(&login, dir, db_file)?;
    let mut session =
        SyncSession::connect(&SshConnector, endpoint, &mut PromptPasswords, &mut config)
            .context("could not open remote session")?;

    match command {
        Command::Check => {
            match session.master_info()? {
                Some(info) => println!(
                    "Master database present ({:.1} MB)",
                    info.size as f64 / (1024.0 * 1024.0)
                ),
                None => println!("No master database on the remote yet"),
            }
            session.cleanup(None);
        }
        Command::Pull { out } => {
            let mut bar = ConsoleBar::default();
            let cache = session.fetch(&mut bar)?;
            std::fs::copy(cache.path(), &out)
                .with_context(|| format!("could not write {}", out.display()))?;
            println!("Pulled master to {}", out.display());
            session.cleanup(Some(cache));
        }
        Command::Push { input } => {
            let mut bar = ConsoleBar::default();
            let mut cache = session.fetch(&mut bar)?;
            std::fs::copy(&input, cache.path())
                .with_context(|| format!("could not read {}", input.display()))?;
            cache.mark_changed();

            let mut bar = ConsoleBar::default();
            let result = session.publish(&mut cache, &mut bar);
            session.cleanup(Some(cache));

            match result {
                PublishResult::Published { bytes } => {
                    println!("Published {bytes} bytes to the master");
                }
                PublishResult::NoOp => println!("Nothing to publish"),
                PublishResult::Failed { error, rollback } => {
                    let state = match rollback {
                        RollbackOutcome::NotNeeded => "master untouched",
                        RollbackOutcome::NoBackup => "no backup was available",
                        RollbackOutcome::Restored => "master restored from backup",
                        RollbackOutcome::RestoreFailed(_) => {
                            "backup restore failed, manual intervention required"
                        }
                    };
                    bail!("publish failed ({state}): {error}");
                }
            }
        }
    }

    Ok(())
}
