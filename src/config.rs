use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ApiError, Result};

/// Environment variable holding the backend base URL.
pub const BASE_URL_ENV: &str = "BOREALIS_API_URL";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheTuning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Base URL of the booking backend, e.g. "https://api.borealis.example".
  pub base_url: String,
  /// Per-request timeout in milliseconds.
  #[serde(default = "default_request_timeout_ms")]
  pub request_timeout_ms: u64,
}

impl ApiConfig {
  pub fn request_timeout(&self) -> Duration {
    Duration::from_millis(self.request_timeout_ms)
  }
}

/// Knobs for the in-memory fetch cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheTuning {
  /// Maximum number of cached responses before LRU eviction kicks in.
  #[serde(default = "default_max_entries")]
  pub max_entries: usize,
  /// Freshness window for cached responses, in milliseconds.
  #[serde(default = "default_ttl_ms")]
  pub default_ttl_ms: u64,
  /// How long a 404 is remembered, in milliseconds. Short on purpose:
  /// it only exists to stop repeated-404 thrashing.
  #[serde(default = "default_not_found_ttl_ms")]
  pub not_found_ttl_ms: u64,
}

impl Default for CacheTuning {
  fn default() -> Self {
    Self {
      max_entries: default_max_entries(),
      default_ttl_ms: default_ttl_ms(),
      not_found_ttl_ms: default_not_found_ttl_ms(),
    }
  }
}

impl CacheTuning {
  pub fn default_ttl(&self) -> Duration {
    Duration::from_millis(self.default_ttl_ms)
  }

  pub fn not_found_ttl(&self) -> Duration {
    Duration::from_millis(self.not_found_ttl_ms)
  }
}

fn default_max_entries() -> usize {
  128
}

fn default_ttl_ms() -> u64 {
  30_000
}

fn default_not_found_ttl_ms() -> u64 {
  5_000
}

fn default_request_timeout_ms() -> u64 {
  10_000
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./borealis.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/borealis/config.yaml
  /// 4. ~/.config/borealis/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(ApiError::Config(format!(
          "config file not found: {}",
          p.display()
        )));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(ApiError::Config(
        "no configuration file found; create one at ~/.config/borealis/config.yaml \
         or set BOREALIS_API_URL"
          .to_string(),
      )),
    }
  }

  /// Build a configuration from the environment alone.
  ///
  /// Fails fast with [`ApiError::MissingBaseUrl`] before any network attempt
  /// when `BOREALIS_API_URL` is unset or blank.
  pub fn from_env() -> Result<Self> {
    let base_url = std::env::var(BASE_URL_ENV)
      .ok()
      .filter(|v| !v.trim().is_empty())
      .ok_or(ApiError::MissingBaseUrl)?;

    Ok(Self {
      api: ApiConfig {
        base_url,
        request_timeout_ms: default_request_timeout_ms(),
      },
      cache: CacheTuning::default(),
    })
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("borealis.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("borealis").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
      ApiError::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    let config: Config = serde_yaml::from_str(&contents).map_err(|e| {
      ApiError::Config(format!(
        "failed to parse config file {}: {}",
        path.display(),
        e
      ))
    })?;

    if config.api.base_url.trim().is_empty() {
      return Err(ApiError::MissingBaseUrl);
    }

    Ok(config)
  }
}
