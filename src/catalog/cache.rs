//! Caching implementations for catalog types.

use crate::cache::Cacheable;

use super::types::Product;

impl Cacheable for Product {
  fn key_prefix() -> &'static str {
    "products"
  }
}
