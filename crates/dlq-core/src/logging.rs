//! Tracing setup for the `dlq` binary.
//!
//! Events go to `$XDG_STATE_HOME/dlq/dlq.log` when that file can be opened,
//! otherwise to stderr. `RUST_LOG` overrides [`DEFAULT_FILTER`].

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Directives used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,dlq_core=debug,dlq_cli=debug";

const LOG_FILE_NAME: &str = "dlq.log";

/// Where [`init_logging`] writes. The xdg prefix already scopes the state
/// dir to `dlq`.
pub fn log_file_path() -> Result<PathBuf> {
    let dirs = xdg::BaseDirectories::with_prefix("dlq").context("resolve XDG dirs")?;
    Ok(dirs.get_state_home().join(LOG_FILE_NAME))
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open {}", path.display()))
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

fn install<W>(writer: W) -> Result<()>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(writer)
        .with_target(true)
        .with_thread_ids(true)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {}", e))
}

/// Log to the state-dir file. Errors leave no subscriber installed, so the
/// caller can fall back to [`init_logging_stderr`].
pub fn init_logging() -> Result<()> {
    let path = log_file_path()?;
    let file = open_log_file(&path)?;
    install(Mutex::new(file))?;
    tracing::info!(path = %path.display(), "logging initialized");
    Ok(())
}

/// Log to stderr. A subscriber that is already installed wins.
pub fn init_logging_stderr() {
    let _ = install(std::io::stderr);
}
