// src/pipeline/controller.rs

//! Lifecycle of crawl runs.
//!
//! [`CrawlController`] is the single entry point the CLI and the HTTP API
//! use. At most one run is active at a time: starting a new run cancels the
//! previous one and waits for it to drain first.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::{Config, CrawlStats, CrawlerConfig, RunState, StorageBackend};
use crate::pipeline::crawl::{Crawl, RunMonitor};
use crate::pipeline::pool::WorkerPool;
use crate::services::{Fetcher, HtmlParser, HttpFetcher, Parser};
use crate::storage::{LocalStorage, MemoryStorage, PageStorage};

struct ActiveRun {
    cancel: CancellationToken,
    handle: JoinHandle<CrawlStats>,
}

/// Starts, stops and reports on crawl runs.
pub struct CrawlController {
    fetcher: Arc<dyn Fetcher>,
    parser: Arc<dyn Parser>,
    storage: Arc<dyn PageStorage>,
    config: CrawlerConfig,
    // Replaced on every start so a superseded run cannot touch new stats
    monitor: Mutex<Arc<RunMonitor>>,
    active: tokio::sync::Mutex<Option<ActiveRun>>,
}

impl CrawlController {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        parser: Arc<dyn Parser>,
        storage: Arc<dyn PageStorage>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            fetcher,
            parser,
            storage,
            config,
            monitor: Mutex::new(Arc::new(RunMonitor::new())),
            active: tokio::sync::Mutex::new(None),
        }
    }

    /// Build a controller with the HTTP fetcher, the HTML parser and the
    /// storage backend selected by `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let storage: Arc<dyn PageStorage> = match config.storage.backend {
            StorageBackend::Local => Arc::new(LocalStorage::new(&config.storage.dir)),
            StorageBackend::Memory => Arc::new(MemoryStorage::new()),
        };

        Ok(Self::new(
            Arc::new(HttpFetcher::new(&config.crawler)?),
            Arc::new(HtmlParser::new()),
            storage,
            config.crawler.clone(),
        ))
    }

    /// Default depth for callers that don't pick one.
    pub fn default_depth(&self) -> usize {
        self.config.max_depth
    }

    /// Begin a run from `seeds`, following internal links up to `max_depth`
    /// hops away.
    ///
    /// Any run already in progress is cancelled and drained first. Returns
    /// once the new run has been launched.
    pub async fn start(&self, seeds: Vec<String>, max_depth: usize) -> Result<()> {
        self.config.validate()?;

        let mut active = self.active.lock().await;
        if let Some(previous) = active.take() {
            log::info!("Cancelling previous crawl run");
            previous.cancel.cancel();
            self.join(previous).await;
        }

        let cancel = CancellationToken::new();
        let pool = WorkerPool::new(
            Arc::clone(&self.fetcher),
            self.config.workers,
            self.config.queue_size,
            &cancel,
        )?;
        let monitor = Arc::new(RunMonitor::new());
        monitor.set_state(RunState::Running);
        let crawl = Crawl::new(
            pool,
            Arc::clone(&self.parser),
            Arc::clone(&self.storage),
            Arc::clone(&monitor),
            max_depth,
        )?;
        *self.monitor.lock().unwrap_or_else(PoisonError::into_inner) = monitor;

        log::info!(
            "Starting crawl of {} seed(s) with {} workers, max depth {}",
            seeds.len(),
            self.config.workers,
            max_depth
        );
        let handle = tokio::spawn(crawl.run(seeds));
        *active = Some(ActiveRun { cancel, handle });
        Ok(())
    }

    /// Cancel the active run, wait for it to drain and return its stats.
    ///
    /// Without an active run this just returns the last stats.
    pub async fn stop(&self) -> CrawlStats {
        let mut active = self.active.lock().await;
        if let Some(run) = active.take() {
            log::info!("Stopping crawl");
            run.cancel.cancel();
            if !run.handle.is_finished() {
                self.monitor().set_state(RunState::Draining);
            }
            self.join(run).await;
        }
        self.stats()
    }

    /// Wait for the active run to finish on its own.
    ///
    /// Dropping the returned future leaves the run untouched, so it can be
    /// raced against a shutdown signal followed by [`stop`](Self::stop).
    pub async fn wait(&self) -> CrawlStats {
        let mut active = self.active.lock().await;
        if let Some(run) = active.as_mut() {
            if let Err(e) = (&mut run.handle).await {
                log::error!("Crawl task failed: {}", e);
            }
            self.monitor().set_state(RunState::Idle);
            *active = None;
        }
        self.stats()
    }

    /// Snapshot of the current (or most recent) run's counters.
    pub fn stats(&self) -> CrawlStats {
        self.monitor().snapshot()
    }

    pub fn state(&self) -> RunState {
        self.monitor().state()
    }

    /// Stored page URLs matching `keyword`.
    pub async fn pages(&self, keyword: &str) -> Result<Vec<String>> {
        self.storage.search_pages(keyword).await
    }

    /// Remove every stored page.
    pub async fn clear_pages(&self) -> Result<()> {
        self.storage.clear().await
    }

    fn monitor(&self) -> Arc<RunMonitor> {
        Arc::clone(&self.monitor.lock().unwrap_or_else(PoisonError::into_inner))
    }

    /// Wait for a run's task to exit. The run is idle afterwards however
    /// the task ended.
    async fn join(&self, run: ActiveRun) {
        if let Err(e) = run.handle.await {
            log::error!("Crawl task failed: {}", e);
        }
        self.monitor().set_state(RunState::Idle);
    }
}
