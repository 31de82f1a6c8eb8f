//! Durable storage trait and file-backed implementation.

use color_eyre::{eyre::eyre, Result};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Name of the directory that holds cached pages.
const CACHE_DIR_NAME: &str = "ProductsCache";

/// Trait for the durable tier of the cache.
///
/// Backends only deal in encoded bytes; encoding is the cache store's job.
pub trait CacheStorage: Send + Sync {
  /// Persist the bytes stored under `key`, replacing any previous entry.
  fn write(&self, key: &str, data: &[u8]) -> Result<()>;

  /// Read the bytes stored under `key`. A missing entry is `Ok(None)`.
  fn read(&self, key: &str) -> Result<Option<Vec<u8>>>;

  /// Remove every entry.
  fn clear(&self) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn write(&self, _key: &str, _data: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn read(&self, _key: &str) -> Result<Option<Vec<u8>>> {
    Ok(None) // Always miss
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// File-based storage: one file per key, named exactly as the key.
pub struct FileStorage {
  dir: PathBuf,
}

impl FileStorage {
  /// Open storage inside `<base>/ProductsCache`, creating it if needed.
  pub fn open(base: &Path) -> Result<Self> {
    let dir = base.join(CACHE_DIR_NAME);

    std::fs::create_dir_all(&dir)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", dir.display(), e))?;

    Ok(Self { dir })
  }

  /// Get the default cache base directory.
  pub fn default_base() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".cache")))
      .ok_or_else(|| eyre!("Could not determine cache directory"))?;

    Ok(cache_dir.join("shopfront"))
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  fn entry_path(&self, key: &str) -> Result<PathBuf> {
    if key.is_empty() || key.starts_with('.') || key.contains(['/', '\\']) {
      return Err(eyre!("Invalid cache key '{}'", key));
    }
    Ok(self.dir.join(key))
  }
}

impl CacheStorage for FileStorage {
  fn write(&self, key: &str, data: &[u8]) -> Result<()> {
    let path = self.entry_path(key)?;

    // The directory may have been removed by a clear
    std::fs::create_dir_all(&self.dir)
      .map_err(|e| eyre!("Failed to create cache directory {}: {}", self.dir.display(), e))?;

    // Each write gets its own sibling temp file, renamed over the entry so
    // readers never see half an entry. Dropping it on error removes it.
    let mut tmp = tempfile::Builder::new()
      .prefix(&format!(".{}.", key))
      .suffix(".tmp")
      .tempfile_in(&self.dir)
      .map_err(|e| eyre!("Failed to create temp file in {}: {}", self.dir.display(), e))?;
    tmp
      .write_all(data)
      .map_err(|e| eyre!("Failed to write cache entry {}: {}", tmp.path().display(), e))?;
    tmp
      .persist(&path)
      .map_err(|e| eyre!("Failed to replace cache entry {}: {}", path.display(), e.error))?;

    Ok(())
  }

  fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
    let path = self.entry_path(key)?;

    match std::fs::read(&path) {
      Ok(data) => Ok(Some(data)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(eyre!("Failed to read cache entry {}: {}", path.display(), e)),
    }
  }

  fn clear(&self) -> Result<()> {
    match std::fs::remove_dir_all(&self.dir) {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(eyre!(
        "Failed to remove cache directory {}: {}",
        self.dir.display(),
        e
      )),
    }
  }
}
