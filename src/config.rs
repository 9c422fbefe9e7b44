use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub ui: UiConfig,
  #[serde(default)]
  pub log: LogConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Prefix for every endpoint, e.g. "http://localhost:8000/api"
  #[serde(default = "default_base_url")]
  pub base_url: String,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
    }
  }
}

fn default_base_url() -> String {
  DEFAULT_API_BASE_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct UiConfig {
  /// How often views poll the query cache
  #[serde(default = "default_tick_rate_ms")]
  pub tick_rate_ms: u64,
}

impl Default for UiConfig {
  fn default() -> Self {
    Self {
      tick_rate_ms: default_tick_rate_ms(),
    }
  }
}

fn default_tick_rate_ms() -> u64 {
  250
}

#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
  /// Log file (default: $XDG_DATA_HOME/beatmatchr/beatmatchr.log)
  pub file: Option<PathBuf>,
  /// Filter directive used when neither BEATMATCHR_LOG nor RUST_LOG is set
  #[serde(default = "default_log_level")]
  pub level: String,
}

impl Default for LogConfig {
  fn default() -> Self {
    Self {
      file: None,
      level: default_log_level(),
    }
  }
}

fn default_log_level() -> String {
  "info".to_string()
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./beatmatchr.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/beatmatchr/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("beatmatchr.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("beatmatchr").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file is a valid "all defaults" config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }

  /// Default log file location
  pub fn default_log_file() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("beatmatchr").join("beatmatchr.log"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "http://localhost:8000/api");
    assert_eq!(config.ui.tick_rate_ms, 250);
    assert_eq!(config.log.level, "info");
    assert!(config.log.file.is_none());
  }

  #[test]
  fn test_parse_partial_file() {
    let config = Config::parse("api:\n  base_url: https://beats.example.com/api\n").unwrap();
    assert_eq!(config.api.base_url, "https://beats.example.com/api");
    assert_eq!(config.ui.tick_rate_ms, 250);
  }

  #[test]
  fn test_parse_empty_file() {
    let config = Config::parse("\n").unwrap();
    assert_eq!(config.api.base_url, DEFAULT_API_BASE_URL);
  }

  #[test]
  fn test_parse_full_file() {
    let config = Config::parse(
      "api:\n  base_url: http://10.0.0.5:9000/api\nui:\n  tick_rate_ms: 100\nlog:\n  file: /tmp/bm.log\n  level: debug\n",
    )
    .unwrap();
    assert_eq!(config.ui.tick_rate_ms, 100);
    assert_eq!(config.log.file.as_deref(), Some(Path::new("/tmp/bm.log")));
    assert_eq!(config.log.level, "debug");
  }

  #[test]
  fn test_explicit_missing_path_is_error() {
    let err = Config::load(Some(Path::new("/definitely/not/here.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
