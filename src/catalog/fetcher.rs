//! Product fetcher that wraps CatalogClient with write-through caching.

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{info, warn};

use crate::cache::{CacheResult, CacheStore, Cacheable};
use crate::paging::PageSource;
use crate::reachability::Connectivity;

use super::client::CatalogClient;
use super::error::FetchError;
use super::types::Product;

/// Catalog client with transparent caching and offline fallback.
///
/// Successful fetches are written to the cache before they are returned.
/// While offline, the best available cached page is served instead.
#[derive(Clone)]
pub struct ProductFetcher {
  inner: CatalogClient,
  cache: CacheStore,
  connectivity: Connectivity,
}

impl ProductFetcher {
  pub fn new(inner: CatalogClient, cache: CacheStore, connectivity: Connectivity) -> Self {
    Self {
      inner,
      cache,
      connectivity,
    }
  }

  /// Fetch the first `limit` products.
  pub async fn fetch_page(&self, limit: u32) -> Result<CacheResult<Vec<Product>>, FetchError> {
    let key = Product::page_key(limit);

    if !self.connectivity.is_connected() {
      return match self.cache.load_any::<Product>() {
        Some(products) => {
          info!(limit, count = products.len(), "Offline, serving cached products");
          Ok(CacheResult::offline(products))
        }
        None => {
          warn!(limit, "Offline with no cached products");
          Err(FetchError::NoInternet)
        }
      };
    }

    let products = self.inner.get_products(limit).await?;
    self.cache.save(&products, &key);

    info!(limit, count = products.len(), "Fetched products");
    Ok(CacheResult::from_network(products))
  }
}

impl PageSource for ProductFetcher {
  fn load_page(&self, limit: u32) -> BoxFuture<'_, Result<CacheResult<Vec<Product>>, FetchError>> {
    self.fetch_page(limit).boxed()
  }
}
