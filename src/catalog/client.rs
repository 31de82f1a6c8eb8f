use crate::catalog::error::FetchError;
use crate::catalog::types::Product;
use crate::config::ApiConfig;
use color_eyre::{eyre::eyre, Result};
use std::time::Duration;
use url::Url;

/// Catalog API client wrapper
#[derive(Clone)]
pub struct CatalogClient {
  http: reqwest::Client,
  base_url: String,
}

impl CatalogClient {
  pub fn new(config: &ApiConfig) -> Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.base_url.clone(),
    })
  }

  /// Build the URL for a page of `limit` products
  pub fn products_url(&self, limit: u32) -> Result<Url, FetchError> {
    let endpoint = format!("{}/products", self.base_url.trim_end_matches('/'));

    let mut url = Url::parse(&endpoint).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
    if url.cannot_be_a_base() {
      return Err(FetchError::InvalidUrl(endpoint));
    }
    url
      .query_pairs_mut()
      .append_pair("limit", &limit.to_string());

    Ok(url)
  }

  /// Get the first `limit` products
  pub async fn get_products(&self, limit: u32) -> Result<Vec<Product>, FetchError> {
    let url = self.products_url(limit)?;

    let response = self
      .http
      .get(url)
      .send()
      .await
      .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::RequestFailed(format!("HTTP {}", status)));
    }

    let body = response
      .bytes()
      .await
      .map_err(|e| FetchError::RequestFailed(e.to_string()))?;

    if body.is_empty() {
      return Err(FetchError::NoData);
    }

    serde_json::from_slice(&body).map_err(|e| FetchError::DecodingError(e.to_string()))
  }
}
