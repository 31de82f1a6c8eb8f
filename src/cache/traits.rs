//! Core traits and types for the caching system.

use serde::{de::DeserializeOwned, Serialize};

/// Trait for entities that can be cached as pages.
///
/// A page is stored under `<prefix>_<limit>`, where `limit` is the page size
/// that was requested from the server.
pub trait Cacheable: Clone + Send + Sync + Serialize + DeserializeOwned {
  /// Key prefix for pages of this entity (e.g., "products")
  fn key_prefix() -> &'static str;

  /// Cache key for a page fetched with the given limit.
  fn page_key(limit: u32) -> String {
    format!("{}_{}", Self::key_prefix(), limit)
  }
}

/// Result from a fetch, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result for offline mode.
  pub fn offline(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
    }
  }

  pub fn is_offline(&self) -> bool {
    self.source == CacheSource::Offline
  }
}

/// Indicates where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Offline mode - network unavailable, serving the best cached page
  Offline,
}
