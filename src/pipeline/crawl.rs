// src/pipeline/crawl.rs

//! Breadth-first crawl orchestration.
//!
//! A [`Crawl`] owns everything one run mutates. The visited set, the depth
//! map and the pending counter are touched only by the task driving
//! [`Crawl::run`]; workers never see them. Statistics live in a
//! [`RunMonitor`] behind a mutex so status queries can read snapshots while
//! the run mutates them.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{CrawlStats, RunState};
use crate::pipeline::pool::{FetchResult, WorkerPool};
use crate::services::Parser;
use crate::storage::PageStorage;
use crate::utils::url::{normalize, request_url};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Statistics and lifecycle state of one run, shared with status queries.
#[derive(Debug, Default)]
pub struct RunMonitor {
    stats: Mutex<CrawlStats>,
    state: Mutex<RunState>,
}

impl RunMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current counters.
    pub fn snapshot(&self) -> CrawlStats {
        *lock(&self.stats)
    }

    pub fn state(&self) -> RunState {
        *lock(&self.state)
    }

    pub(crate) fn set_state(&self, state: RunState) {
        *lock(&self.state) = state;
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut CrawlStats)) {
        f(&mut lock(&self.stats));
    }
}

/// One crawl run: traversal state plus the pool doing its fetches.
pub struct Crawl {
    pool: WorkerPool,
    results: mpsc::Receiver<FetchResult>,
    parser: Arc<dyn Parser>,
    storage: Arc<dyn PageStorage>,
    monitor: Arc<RunMonitor>,
    cancel: CancellationToken,
    max_depth: usize,
    visited: HashSet<String>,
    depths: HashMap<String, usize>,
    // Submitted request URL -> normalized key, until its result arrives
    requested: HashMap<String, String>,
    pending: usize,
    // Results received while blocked on a full job queue
    backlog: VecDeque<FetchResult>,
}

impl Crawl {
    /// Take over `pool`, claim its result stream and start its workers.
    pub fn new(
        mut pool: WorkerPool,
        parser: Arc<dyn Parser>,
        storage: Arc<dyn PageStorage>,
        monitor: Arc<RunMonitor>,
        max_depth: usize,
    ) -> Result<Self> {
        let results = pool
            .results()
            .ok_or_else(|| AppError::config("worker pool results are already claimed"))?;
        let cancel = pool.token().clone();
        pool.start();

        Ok(Self {
            pool,
            results,
            parser,
            storage,
            monitor,
            cancel,
            max_depth,
            visited: HashSet::new(),
            depths: HashMap::new(),
            requested: HashMap::new(),
            pending: 0,
            backlog: VecDeque::new(),
        })
    }

    /// Crawl from `seeds` until no work is pending or the run is cancelled.
    ///
    /// The pool is stopped before returning either way. Returns the final
    /// statistics.
    pub async fn run(mut self, seeds: Vec<String>) -> CrawlStats {
        self.monitor.set_state(RunState::Running);

        for seed in &seeds {
            self.discover(seed, 0).await;
        }

        let completed = self.drive().await;
        if !completed {
            self.monitor.set_state(RunState::Draining);
            log::info!(
                "Crawl cancelled with {} job(s) outstanding, draining workers",
                self.pending
            );
        }

        self.pool.stop().await;
        self.monitor.update(|s| s.queued = 0);
        self.monitor.set_state(RunState::Idle);

        let stats = self.monitor.snapshot();
        log::info!(
            "Crawl {}: {} fetched, {} errors, {} stored, {} parse errors, {} storage errors",
            if completed { "complete" } else { "stopped" },
            stats.fetched,
            stats.errors,
            stats.stored,
            stats.parse_errors,
            stats.storage_errors
        );
        stats
    }

    /// Consume results until nothing is pending. Returns `false` when the
    /// loop ended early because of cancellation.
    async fn drive(&mut self) -> bool {
        while self.pending > 0 {
            let result = match self.backlog.pop_front() {
                Some(result) => result,
                None => tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return false,
                    next = self.results.recv() => match next {
                        Some(result) => result,
                        None => {
                            log::warn!("Result stream closed with {} job(s) pending", self.pending);
                            return false;
                        }
                    },
                },
            };
            if self.cancel.is_cancelled() {
                return false;
            }

            self.pending -= 1;
            self.handle(result).await;
        }
        true
    }

    async fn handle(&mut self, result: FetchResult) {
        let FetchResult { url: target, body } = result;
        let url = self
            .requested
            .remove(&target)
            .unwrap_or_else(|| target.clone());
        let pending = self.pending;

        let body = match body {
            Ok(body) => {
                self.monitor.update(|s| {
                    s.fetched += 1;
                    s.queued = pending;
                });
                body
            }
            Err(e) => {
                self.monitor.update(|s| {
                    s.errors += 1;
                    s.queued = pending;
                });
                log::warn!("Failed to fetch {}: {}", url, e);
                return;
            }
        };

        // Relative links resolve against the address as fetched
        let data = match self.parser.parse(&target, &body) {
            Ok(data) => data,
            Err(e) => {
                self.monitor.update(|s| s.parse_errors += 1);
                log::warn!("Failed to parse {}: {}", url, e);
                return;
            }
        };

        match self.storage.save_page(&url, &data).await {
            Ok(()) => self.monitor.update(|s| s.stored += 1),
            Err(e) => {
                self.monitor.update(|s| s.storage_errors += 1);
                log::warn!("Failed to store {}: {}", url, e);
            }
        }

        let depth = self.depths.get(&url).copied().unwrap_or(0);
        if depth >= self.max_depth {
            return;
        }
        log::debug!(
            "Expanding {} internal link(s) from {} at depth {}",
            data.internal_links.len(),
            url,
            depth
        );
        for link in &data.internal_links {
            if self.cancel.is_cancelled() {
                break;
            }
            self.discover(link, depth + 1).await;
        }
    }

    /// Mark a URL visited and queue it, unless it was seen before.
    ///
    /// Visited, depth and storage bookkeeping use the normalized key; the
    /// pool fetches the link as written, minus its fragment.
    async fn discover(&mut self, raw: &str, depth: usize) {
        let parsed = request_url(raw).and_then(|target| {
            let key = normalize(target.as_str())?;
            Ok((key, String::from(target)))
        });
        let (url, target) = match parsed {
            Ok(pair) => pair,
            Err(e) => {
                log::debug!("Dropping link: {}", e);
                return;
            }
        };
        if !self.visited.insert(url.clone()) {
            return;
        }
        self.depths.insert(url.clone(), depth);

        self.requested.insert(target.clone(), url);
        if self.enqueue(target).await {
            self.pending += 1;
            let pending = self.pending;
            self.monitor.update(|s| s.queued = pending);
        }
    }

    /// Submit to the pool, buffering results that arrive meanwhile so a
    /// full job queue and a full result queue cannot block each other.
    async fn enqueue(&mut self, url: String) -> bool {
        loop {
            tokio::select! {
                biased;
                accepted = self.pool.submit(url.clone()) => return accepted,
                Some(result) = self.results.recv() => self.backlog.push_back(result),
            }
        }
    }
}
