use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use shopfront::cache::Cacheable;
use shopfront::catalog::Product;
use shopfront::{app, config};

#[derive(Parser, Debug)]
#[command(name = "shopfront")]
#[command(about = "An offline-first product catalog browser")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/shopfront/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Catalog API root URL
  #[arg(long, env = "SHOPFRONT_BASE_URL")]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Page through the catalog
  Browse {
    /// Number of pages to load
    #[arg(short, long, default_value_t = 3)]
    pages: usize,

    /// Skip the network and serve cached pages only
    #[arg(long)]
    offline: bool,
  },

  /// Inspect the page cache
  Cache {
    #[command(subcommand)]
    action: CacheAction,
  },
}

#[derive(Subcommand, Debug)]
enum CacheAction {
  /// Print a cached page (default: the first available page)
  Show {
    #[arg(short, long)]
    limit: Option<u32>,
  },
  /// Remove every cached page
  Clear,
}

/// Send logs to a file so they never interleave with catalog output
fn init_tracing() -> Result<WorkerGuard> {
  let log_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?
    .join("shopfront");

  std::fs::create_dir_all(&log_dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", log_dir.display(), e))?;

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let file_appender = tracing_appender::rolling::never(&log_dir, "shopfront.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

  tracing_subscriber::registry()
    .with(filter)
    .with(
      fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true),
    )
    .init();

  Ok(guard)
}

/// Load the config file, then apply the command line and environment
fn load_config(args: &Args) -> Result<config::Config> {
  let mut config = config::Config::load(args.config.as_deref())?;

  if let Some(base_url) = &args.base_url {
    config.api.base_url = base_url.clone();
  }

  Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;
  let _guard = init_tracing()?;

  let args = Args::parse();

  let config = load_config(&args)?;

  match args.command.unwrap_or(Command::Browse {
    pages: 3,
    offline: false,
  }) {
    Command::Browse { pages, offline } => {
      let mut app = app::App::new(&config, offline)?;
      app.browse(pages).await?;
    }
    Command::Cache { action } => {
      let cache = app::open_cache(&config)?;
      match action {
        CacheAction::Show { limit } => {
          let products = match limit {
            Some(limit) => cache.load::<Product>(&Product::page_key(limit)),
            None => cache.load_any::<Product>(),
          };
          match products {
            Some(products) => app::print_products(&products, 0),
            None => println!("No cached products"),
          }
        }
        CacheAction::Clear => {
          cache.clear();
          println!("Cache cleared");
        }
      }
    }
  }

  Ok(())
}
