//! Logging init: the TUI owns the terminal, so events go to a file in the data dir.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize structured logging to `<data dir>/vlook.log`.
///
/// The returned guard flushes buffered events on drop and must live until exit.
pub fn init_logging() -> Result<WorkerGuard> {
  let proj_dirs = ProjectDirs::from("", "", "vlook").context("No home directory for log file")?;
  let log_dir = proj_dirs.data_dir();
  std::fs::create_dir_all(log_dir).with_context(|| format!("Failed to create {}", log_dir.display()))?;

  let appender = tracing_appender::rolling::never(log_dir, "vlook.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,vlook=debug"));

  tracing_subscriber::fmt()
    .with_env_filter(env_filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| anyhow::anyhow!(e))
    .context("Failed to install tracing subscriber")?;

  tracing::info!(dir = %log_dir.display(), "vlook logging initialized");
  Ok(guard)
}
