mod api;
mod app;
mod config;
mod event;
mod logging;
mod query;
#[cfg(test)]
mod testing;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "beatmatchr")]
#[command(about = "A terminal editor for Beatmatchr audio projects")]
#[command(version)]
struct Args {
  /// Path to config file (default: ./beatmatchr.yaml, then $XDG_CONFIG_HOME/beatmatchr/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend API base URL, e.g. http://localhost:8000/api
  #[arg(long, env = "BEATMATCHR_API_BASE_URL")]
  api_url: Option<String>,

  /// Open this project's detail view on start
  #[arg(short, long)]
  project: Option<String>,

  /// Write logs here instead of the default data directory
  #[arg(long)]
  log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let mut config = config::Config::load(args.config.as_deref())?;
  if let Some(url) = args.api_url {
    config.api.base_url = url;
  }

  let log_file = match args.log_file.or_else(|| config.log.file.clone()) {
    Some(path) => path,
    None => config::Config::default_log_file()?,
  };
  // Flushes buffered log lines when main returns
  let _log_guard = logging::init(&log_file, &config.log.level)?;

  let mut app = app::App::new(&config, args.project.as_deref())?;
  app.run().await?;

  Ok(())
}
