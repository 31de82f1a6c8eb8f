use thiserror::Error;

/// Why a single page fetch failed.
///
/// Every variant is terminal for that attempt; nothing is retried here.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
  /// The request URL could not be built from the configured base URL.
  #[error("Invalid request URL: {0}")]
  InvalidUrl(String),

  /// Offline and no cached page was available.
  #[error("No internet connection")]
  NoInternet,

  /// Transport failure or non-success HTTP status.
  #[error("Request failed: {0}")]
  RequestFailed(String),

  /// The response body was not a list of products.
  #[error("Failed to decode products: {0}")]
  DecodingError(String),

  /// The server answered with an empty body.
  #[error("Response contained no data")]
  NoData,
}

impl FetchError {
  pub fn is_offline(&self) -> bool {
    matches!(self, FetchError::NoInternet)
  }
}
