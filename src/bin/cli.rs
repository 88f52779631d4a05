//! sitecrawler CLI
//!
//! Local execution entry point: one-off crawls, page queries and the HTTP API.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sitecrawler::{
    error::{AppError, Result},
    models::Config,
    pipeline::CrawlController,
};

/// sitecrawler - Same-host Site Crawler
#[derive(Parser, Debug)]
#[command(
    name = "sitecrawler",
    version,
    about = "Concurrent breadth-first crawler for a single site"
)]
struct Cli {
    /// Path to storage directory containing config.toml and pages.jsonl
    #[arg(short, long, env = "SITECRAWLER_STORAGE_DIR", default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl from the given seed URLs until done or interrupted
    Crawl {
        /// Seed URLs
        #[arg(required = true)]
        seeds: Vec<String>,

        /// Link depth to follow from the seeds
        #[arg(long)]
        max_depth: Option<usize>,

        /// Number of concurrent fetch workers
        #[arg(long)]
        workers: Option<usize>,

        /// Capacity of the job and result queues
        #[arg(long)]
        queue_size: Option<usize>,
    },

    /// Serve the HTTP API
    #[cfg(feature = "api")]
    Serve {
        /// Address to bind (default: server.bind from config)
        #[arg(long, env = "SITECRAWLER_BIND")]
        bind: Option<String>,
    },

    /// List stored pages
    Pages {
        /// Only pages whose title or URL contains this keyword
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Remove all stored pages
    Clear,

    /// Validate configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    if !config_path.exists() {
        config.storage.dir = cli.storage_dir.clone();
    }
    log::debug!("Using storage directory {}", cli.storage_dir.display());

    match cli.command {
        Command::Crawl {
            seeds,
            max_depth,
            workers,
            queue_size,
        } => {
            if let Some(workers) = workers {
                config.crawler.workers = workers;
            }
            if let Some(queue_size) = queue_size {
                config.crawler.queue_size = queue_size;
            }
            let controller = CrawlController::from_config(&config)?;
            let depth = max_depth.unwrap_or_else(|| controller.default_depth());

            controller.start(seeds, depth).await?;
            let stats = tokio::select! {
                stats = controller.wait() => stats,
                _ = tokio::signal::ctrl_c() => {
                    log::warn!("Interrupted, stopping crawl...");
                    controller.stop().await
                }
            };

            log::info!(
                "Crawl summary: {} fetched, {} errors, {} stored",
                stats.fetched,
                stats.errors,
                stats.stored
            );
            if stats.parse_errors + stats.storage_errors > 0 {
                log::warn!(
                    "{} page(s) failed to parse, {} failed to store",
                    stats.parse_errors,
                    stats.storage_errors
                );
            }
        }

        #[cfg(feature = "api")]
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let controller = std::sync::Arc::new(CrawlController::from_config(&config)?);
            sitecrawler::api::serve(controller, &bind).await?;
        }

        Command::Pages { query } => {
            let controller = CrawlController::from_config(&config)?;
            let pages = controller.pages(&query).await?;
            if pages.is_empty() {
                log::info!("No stored pages match '{}'", query);
            }
            for url in pages {
                println!("{url}");
            }
        }

        Command::Clear => {
            let controller = CrawlController::from_config(&config)?;
            controller.clear_pages().await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if !config_path.exists() {
                return Err(AppError::config(format!(
                    "{} not found",
                    config_path.display()
                )));
            }
            if let Err(e) = Config::load(&config_path).and_then(|c| c.validate()) {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }
    }

    Ok(())
}
