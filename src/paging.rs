//! Incremental paging over the product catalog.
//!
//! `PagingController` owns the accumulated product list and asks its
//! [`PageSource`] for a growing limit (7, 14, 21, ...). Fetches run on a
//! spawned task; results travel back over a channel and are applied, with
//! callbacks fired, only when the owner calls `poll()` or `settle()`. All
//! state changes therefore happen on the owner's task.
//!
//! # Example
//!
//! ```ignore
//! let mut paging = PagingController::new(Arc::new(fetcher))
//!   .on_loading_changed(|loading| spinner.set(loading))
//!   .on_products_updated(|| redraw())
//!   .on_error(|message| show_banner(message));
//!
//! paging.fetch_next_page();
//!
//! // In event loop tick
//! if paging.poll() {
//!   // State changed, trigger re-render
//! }
//! ```

use futures::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::cache::{CacheResult, PAGE_STRIDE};
use crate::catalog::{FetchError, Product};

/// Shown when offline and nothing was cached.
pub const OFFLINE_MESSAGE: &str = "No internet connection. Showing cached data.";

/// Shown for every other failure.
pub const RETRY_MESSAGE: &str = "Failed to load products. Please try again.";

pub type PageResult = Result<CacheResult<Vec<Product>>, FetchError>;

/// Where pages come from.
pub trait PageSource: Send + Sync {
  /// Load the first `limit` products.
  fn load_page(&self, limit: u32) -> BoxFuture<'_, PageResult>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PagingError {
  #[error("Product index {index} out of range (have {len})")]
  IndexOutOfRange { index: usize, len: usize },
}

/// Map a fetch failure to the message shown to the user.
pub fn user_message(error: &FetchError) -> &'static str {
  if error.is_offline() {
    OFFLINE_MESSAGE
  } else {
    RETRY_MESSAGE
  }
}

type LoadingFn = Box<dyn FnMut(bool) + Send>;
type UpdatedFn = Box<dyn FnMut() + Send>;
type ErrorFn = Box<dyn FnMut(&str) + Send>;

/// Observer callbacks registered by the presentation layer
#[derive(Default)]
struct Callbacks {
  loading_changed: Option<LoadingFn>,
  products_updated: Option<UpdatedFn>,
  error: Option<ErrorFn>,
}

/// Owns the accumulated product list and drives page fetches.
pub struct PagingController {
  source: Arc<dyn PageSource>,
  products: Vec<Product>,
  current_limit: u32,
  is_loading: bool,
  last_error: Option<String>,
  receiver: Option<mpsc::UnboundedReceiver<PageResult>>,
  callbacks: Callbacks,
}

impl PagingController {
  pub fn new(source: Arc<dyn PageSource>) -> Self {
    Self {
      source,
      products: Vec::new(),
      current_limit: PAGE_STRIDE,
      is_loading: false,
      last_error: None,
      receiver: None,
      callbacks: Callbacks::default(),
    }
  }

  /// Called with `true` when a fetch starts and `false` when it completes.
  pub fn on_loading_changed(mut self, f: impl FnMut(bool) + Send + 'static) -> Self {
    self.callbacks.loading_changed = Some(Box::new(f));
    self
  }

  /// Called after products were appended. Re-read `products()` to render.
  pub fn on_products_updated(mut self, f: impl FnMut() + Send + 'static) -> Self {
    self.callbacks.products_updated = Some(Box::new(f));
    self
  }

  /// Called with a user-facing message when a fetch fails.
  pub fn on_error(mut self, f: impl FnMut(&str) + Send + 'static) -> Self {
    self.callbacks.error = Some(Box::new(f));
    self
  }

  pub fn products(&self) -> &[Product] {
    &self.products
  }

  pub fn count(&self) -> usize {
    self.products.len()
  }

  pub fn product_at(&self, index: usize) -> Result<&Product, PagingError> {
    self.products.get(index).ok_or(PagingError::IndexOutOfRange {
      index,
      len: self.products.len(),
    })
  }

  /// Limit the next fetch will request.
  pub fn current_limit(&self) -> u32 {
    self.current_limit
  }

  pub fn is_loading(&self) -> bool {
    self.is_loading
  }

  /// Message from the most recent failed fetch, cleared by the next success.
  pub fn last_error(&self) -> Option<&str> {
    self.last_error.as_deref()
  }

  /// Start fetching the next page.
  ///
  /// Returns `false` without doing anything if a fetch is already in flight.
  pub fn fetch_next_page(&mut self) -> bool {
    if self.is_loading {
      debug!(limit = self.current_limit, "Fetch already in flight");
      return false;
    }

    self.is_loading = true;
    self.notify_loading();

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);

    let source = Arc::clone(&self.source);
    let limit = self.current_limit;
    tokio::spawn(async move {
      let result = source.load_page(limit).await;
      // Ignore send errors - controller may have been dropped
      let _ = tx.send(result);
    });

    true
  }

  /// Report that the item at `index` became visible.
  ///
  /// Displaying the last item triggers the next page. Returns whether a
  /// fetch was started.
  pub fn item_displayed(&mut self, index: usize) -> bool {
    if self.products.len().checked_sub(1) != Some(index) {
      return false;
    }
    self.fetch_next_page()
  }

  /// Apply a finished fetch, if any, without waiting.
  ///
  /// Returns `true` if the state changed. Call this in your event loop tick.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(result) => {
        self.receiver = None;
        self.apply(result);
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Sender dropped without sending - the fetch task died
        self.receiver = None;
        self.apply(Err(cancelled()));
        true
      }
    }
  }

  /// Wait for the in-flight fetch and apply it.
  ///
  /// Returns `false` immediately if nothing is in flight. Cancel safe: if the
  /// returned future is dropped, the result stays queued for the next call.
  pub async fn settle(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    let result = receiver.recv().await.unwrap_or_else(|| Err(cancelled()));
    self.receiver = None;
    self.apply(result);
    true
  }

  fn apply(&mut self, result: PageResult) {
    self.is_loading = false;
    self.notify_loading();

    match result {
      Ok(page) => {
        debug!(
          limit = self.current_limit,
          count = page.data.len(),
          offline = page.is_offline(),
          "Appending page"
        );
        self.products.extend(page.data);
        self.current_limit += PAGE_STRIDE;
        self.last_error = None;

        if let Some(f) = self.callbacks.products_updated.as_mut() {
          f();
        }
      }
      Err(error) => {
        warn!(limit = self.current_limit, error = %error, "Failed to load products");
        let message = user_message(&error);
        self.last_error = Some(message.to_string());

        if let Some(f) = self.callbacks.error.as_mut() {
          f(message);
        }
      }
    }
  }

  fn notify_loading(&mut self) {
    let loading = self.is_loading;
    if let Some(f) = self.callbacks.loading_changed.as_mut() {
      f(loading);
    }
  }
}

impl std::fmt::Debug for PagingController {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("PagingController")
      .field("count", &self.products.len())
      .field("current_limit", &self.current_limit)
      .field("is_loading", &self.is_loading)
      .field("last_error", &self.last_error)
      .finish_non_exhaustive()
  }
}

fn cancelled() -> FetchError {
  FetchError::RequestFailed("page fetch was cancelled".to_string())
}
