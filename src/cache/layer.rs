//! Two-tier cache store: an in-memory fast path over durable storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

use super::storage::CacheStorage;
use super::traits::Cacheable;

/// Page size increment. Canonical cache keys sit at multiples of it.
pub const PAGE_STRIDE: u32 = 7;

/// Largest limit inspected by the offline fallback scan.
pub const FALLBACK_CEILING: u32 = 35;

/// Cache store that keeps encoded pages in memory and on disk.
///
/// The durable tier is the source of truth. The memory tier only ever holds
/// bytes that were written to, or read back from, durable storage. Failures
/// are logged and swallowed: caching is advisory and never fails a caller.
pub struct CacheStore {
  storage: Arc<dyn CacheStorage>,
  memory: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl CacheStore {
  /// Create a new cache store with the given storage backend.
  pub fn new(storage: impl CacheStorage + 'static) -> Self {
    Self {
      storage: Arc::new(storage),
      memory: Arc::new(Mutex::new(HashMap::new())),
    }
  }

  /// Lock the memory tier. A poisoned map still holds whole entries, so keep using it.
  fn memory(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
    self.memory.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Save a page under `key` in both tiers.
  pub fn save<T: Cacheable>(&self, items: &[T], key: &str) {
    let data = match serde_json::to_vec(items) {
      Ok(data) => data,
      Err(e) => {
        warn!(key, error = %e, "Failed to encode page for cache");
        return;
      }
    };

    self.memory().insert(key.to_string(), data.clone());

    if let Err(e) = self.storage.write(key, &data) {
      warn!(key, error = %e, "Failed to persist page to cache");
    } else {
      debug!(key, items = items.len(), "Cached page");
    }
  }

  /// Load the page stored under `key`.
  ///
  /// Checks memory first, then durable storage. A durable hit re-populates
  /// the memory tier. Misses and undecodable entries both return `None`.
  pub fn load<T: Cacheable>(&self, key: &str) -> Option<Vec<T>> {
    let cached = self.memory().get(key).cloned();
    if let Some(data) = cached {
      match serde_json::from_slice(&data) {
        Ok(items) => {
          debug!(key, "Memory cache hit");
          return Some(items);
        }
        Err(e) => debug!(key, error = %e, "Discarding undecodable memory entry"),
      }
    }

    let data = match self.storage.read(key) {
      Ok(Some(data)) => data,
      Ok(None) => {
        debug!(key, "Cache miss");
        return None;
      }
      Err(e) => {
        warn!(key, error = %e, "Failed to read cached page");
        return None;
      }
    };

    match serde_json::from_slice(&data) {
      Ok(items) => {
        debug!(key, "Disk cache hit");
        self.memory().insert(key.to_string(), data);
        Some(items)
      }
      Err(e) => {
        warn!(key, error = %e, "Failed to decode cached page");
        None
      }
    }
  }

  /// Load the first available page among the canonical keys.
  ///
  /// Scans limits 7, 14, ... up to the fallback ceiling in ascending order.
  /// Pages stored under other limits are not considered.
  pub fn load_any<T: Cacheable>(&self) -> Option<Vec<T>> {
    (PAGE_STRIDE..=FALLBACK_CEILING)
      .step_by(PAGE_STRIDE as usize)
      .find_map(|limit| self.load(&T::page_key(limit)))
  }

  /// Drop the memory tier and remove durable storage.
  pub fn clear(&self) {
    self.memory().clear();

    if let Err(e) = self.storage.clear() {
      warn!(error = %e, "Failed to clear cache storage");
    }
  }
}

impl Clone for CacheStore {
  fn clone(&self) -> Self {
    Self {
      storage: Arc::clone(&self.storage),
      memory: Arc::clone(&self.memory),
    }
  }
}
