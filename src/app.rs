use crate::cache::{CacheStore, FileStorage, NoopStorage};
use crate::catalog::{CatalogClient, Product, ProductFetcher};
use crate::config::Config;
use crate::paging::PagingController;
use crate::reachability::{Connectivity, ConnectivityEvent, ReachabilityMonitor};
use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// How long to wait for the first reachability probe before fetching
const FIRST_SIGNAL_TIMEOUT: Duration = Duration::from_secs(3);

/// Open the cache configured for this run
pub fn open_cache(config: &Config) -> Result<CacheStore> {
  if !config.cache.enabled {
    return Ok(CacheStore::new(NoopStorage));
  }

  let base = match &config.cache.directory {
    Some(dir) => dir.clone(),
    None => FileStorage::default_base()?,
  };

  Ok(CacheStore::new(FileStorage::open(&base)?))
}

/// Print products, numbering them from `start`
pub fn print_products(products: &[Product], start: usize) {
  for (offset, product) in products.iter().enumerate() {
    println!(
      "{:>4}. {} - ${:.2} [{}] {:.1}/5 ({} ratings)",
      start + offset + 1,
      product.title,
      product.price,
      product.category,
      product.rating.rate,
      product.rating.count
    );
  }
}

/// What woke the browse loop
enum Step {
  Settled,
  Connectivity(Option<ConnectivityEvent>),
}

/// Line-oriented catalog browser
pub struct App {
  paging: PagingController,
  monitor: Option<ReachabilityMonitor>,
}

impl App {
  /// Wire the data layer together.
  ///
  /// With `offline` set no monitor runs and every fetch is served from cache.
  pub fn new(config: &Config, offline: bool) -> Result<Self> {
    let cache = open_cache(config)?;
    let client = CatalogClient::new(&config.api)?;

    let monitor = if offline {
      None
    } else {
      let monitor = ReachabilityMonitor::for_api(&config.api.base_url, &config.reachability)
        .ok_or_else(|| eyre!("Cannot probe reachability of '{}'", config.api.base_url))?;
      Some(monitor)
    };

    let connectivity = match &monitor {
      Some(monitor) => monitor.connectivity(),
      None => Connectivity::fixed(false),
    };

    let fetcher = ProductFetcher::new(client, cache, connectivity);
    let paging = PagingController::new(Arc::new(fetcher))
      .on_loading_changed(|loading| {
        if loading {
          println!("Loading...");
        }
      })
      .on_products_updated(|| debug!("Products updated"))
      .on_error(|message| eprintln!("! {}", message));

    Ok(Self { paging, monitor })
  }

  pub fn paging(&self) -> &PagingController {
    &self.paging
  }

  /// Load up to `pages` pages, printing products as they arrive.
  ///
  /// The next page is requested when the last printed product is displayed,
  /// and once more after any connectivity change.
  pub async fn browse(&mut self, pages: usize) -> Result<()> {
    let mut events = self.start_monitor().await;

    let mut shown = 0;
    let mut requested = 0;
    let mut refetch = false;

    if pages > 0 && self.paging.fetch_next_page() {
      requested += 1;
    }

    while self.paging.is_loading() {
      let step = match events.as_mut() {
        Some(rx) => tokio::select! {
          _ = self.paging.settle() => Step::Settled,
          event = rx.recv() => Step::Connectivity(event.ok()),
        },
        None => {
          self.paging.settle().await;
          Step::Settled
        }
      };

      match step {
        Step::Settled => {
          let before = shown;
          print_products(&self.paging.products()[before..], before);
          shown = self.paging.count();

          if requested >= pages {
            refetch = false;
            continue;
          }

          let mut started = false;
          if shown > before {
            started = self.paging.item_displayed(shown - 1);
          }
          if !started && refetch {
            started = self.paging.fetch_next_page();
          }
          refetch = false;

          if started {
            requested += 1;
          }
        }
        Step::Connectivity(Some(event)) => {
          print_connectivity(event.is_connected);
          refetch = true;
        }
        Step::Connectivity(None) => {}
      }
    }

    if let Some(monitor) = self.monitor.as_mut() {
      monitor.stop();
    }

    info!(count = self.paging.count(), requested, "Browse finished");
    println!("{} products loaded", self.paging.count());
    Ok(())
  }

  /// Start the monitor and wait briefly for its first observation.
  async fn start_monitor(&mut self) -> Option<broadcast::Receiver<ConnectivityEvent>> {
    let Some(monitor) = self.monitor.as_mut() else {
      print_connectivity(false);
      return None;
    };

    let mut events = monitor.subscribe();
    monitor.start();

    match tokio::time::timeout(FIRST_SIGNAL_TIMEOUT, events.recv()).await {
      Ok(Ok(event)) => print_connectivity(event.is_connected),
      _ => debug!("No reachability signal yet, assuming offline"),
    }

    Some(events)
  }
}

fn print_connectivity(is_connected: bool) {
  if is_connected {
    println!("[online]");
  } else {
    println!("[offline] showing cached data when available");
  }
}
