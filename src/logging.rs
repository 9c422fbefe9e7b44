//! Tracing setup. The terminal belongs to the UI, so logs go to a file.
//!
//! Filter priority (highest first):
//! 1. `BEATMATCHR_LOG`
//! 2. `RUST_LOG`
//! 3. `log.level` from the config file

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub const LOG_ENV: &str = "BEATMATCHR_LOG";

/// Install the global subscriber writing to `file`.
///
/// The returned guard flushes buffered lines on drop; keep it alive in `main`.
pub fn init(file: &Path, level: &str) -> Result<WorkerGuard> {
  let dir = file
    .parent()
    .filter(|p| !p.as_os_str().is_empty())
    .unwrap_or_else(|| Path::new("."));
  let name = file
    .file_name()
    .ok_or_else(|| eyre!("Log file path has no file name: {}", file.display()))?;

  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::never(dir, name);
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let layer = fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true);

  tracing_subscriber::registry()
    .with(build_filter(level))
    .with(layer)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  Ok(guard)
}

fn build_filter(level: &str) -> EnvFilter {
  // An unparseable directive falls through to the next source
  if let Ok(directives) = std::env::var(LOG_ENV) {
    if let Ok(filter) = EnvFilter::try_new(directives) {
      return filter;
    }
  }
  if let Ok(filter) = EnvFilter::try_from_default_env() {
    return filter;
  }
  EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}
