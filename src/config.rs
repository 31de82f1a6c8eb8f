use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub reachability: ReachabilityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
  /// Catalog API root; pages are fetched from `{base_url}/products?limit=N`
  pub base_url: String,
  /// Per-request timeout
  pub timeout_secs: u64,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      base_url: "https://fakestoreapi.com".to_string(),
      timeout_secs: 30,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// When false, pages are only kept in memory for the current run
  pub enabled: bool,
  /// Base directory for cached pages (default: $XDG_CACHE_HOME/shopfront)
  pub directory: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      enabled: true,
      directory: None,
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReachabilityConfig {
  pub probe_interval_ms: u64,
  pub probe_timeout_ms: u64,
}

impl Default for ReachabilityConfig {
  fn default() -> Self {
    Self {
      probe_interval_ms: 2000,
      probe_timeout_ms: 1500,
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./shopfront.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/shopfront/config.yaml
  ///
  /// Every setting has a default, so a missing file is not an error.
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
    // Check current directory
    let local = PathBuf::from("shopfront.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("shopfront").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self, serde_yaml::Error> {
    // An empty file deserializes to unit, not to a mapping
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let config = Config::default();

    assert_eq!(config.api.base_url, "https://fakestoreapi.com");
    assert_eq!(config.api.timeout_secs, 30);
    assert!(config.cache.enabled);
    assert!(config.cache.directory.is_none());
    assert_eq!(config.reachability.probe_interval_ms, 2000);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::parse(
      r#"
api:
  base_url: http://localhost:3000
cache:
  enabled: false
"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "http://localhost:3000");
    assert_eq!(config.api.timeout_secs, 30);
    assert!(!config.cache.enabled);
    assert_eq!(config.reachability.probe_timeout_ms, 1500);
  }

  #[test]
  fn test_empty_file_is_default() {
    let config = Config::parse("\n").unwrap();
    assert_eq!(config.api.base_url, "https://fakestoreapi.com");
  }

  #[test]
  fn test_invalid_yaml_is_error() {
    assert!(Config::parse("api: [unclosed").is_err());
    assert!(Config::parse("api:\n  timeout_secs: soon").is_err());
  }

  #[test]
  fn test_load_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "cache:\n  directory: /tmp/shopfront-test\n").unwrap();

    let config = Config::load(Some(&path)).unwrap();
    assert_eq!(
      config.cache.directory,
      Some(PathBuf::from("/tmp/shopfront-test"))
    );
  }

  #[test]
  fn test_load_missing_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load(Some(&dir.path().join("nope.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }
}
