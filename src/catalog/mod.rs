pub mod cache;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod types;

pub use client::CatalogClient;
pub use error::FetchError;
pub use fetcher::ProductFetcher;
pub use types::Product;
