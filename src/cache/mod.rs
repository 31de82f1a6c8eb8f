//! Page caching for offline support.
//!
//! This module provides a domain-agnostic two-tier cache that:
//! - Stores whole pages of entities under `<prefix>_<limit>` keys
//! - Keeps encoded pages in memory as a fast path over durable storage
//! - Re-populates memory from disk on read (write-through)
//! - Falls back to the first available canonical page when offline

mod layer;
mod storage;
mod traits;

pub use layer::{CacheStore, FALLBACK_CEILING, PAGE_STRIDE};
pub use storage::{CacheStorage, FileStorage, NoopStorage};
pub use traits::{CacheResult, CacheSource, Cacheable};
