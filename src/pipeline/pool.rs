// src/pipeline/pool.rs

//! Bounded worker pool for page fetches.
//!
//! A fixed number of worker tasks pull [`FetchJob`]s from a bounded queue,
//! call the [`Fetcher`] and push [`FetchResult`]s into a second bounded
//! queue. Fetch failures travel through the result queue as data.
//!
//! Lifecycle: `new` → `start` → `submit`* → `stop`. Stopping closes the job
//! queue, lets the workers finish what is already queued, waits for them,
//! closes the result queue and cancels the pool's token.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::services::Fetcher;

/// A URL waiting to be fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub url: String,
}

/// Outcome of one fetch.
#[derive(Debug)]
pub struct FetchResult {
    /// The URL exactly as it was submitted
    pub url: String,
    /// Response body, or why it could not be fetched
    pub body: Result<Vec<u8>>,
}

/// Fixed-size pool of fetch workers.
pub struct WorkerPool {
    fetcher: Arc<dyn Fetcher>,
    workers: usize,
    cancel: CancellationToken,
    job_tx: Option<mpsc::Sender<FetchJob>>,
    job_rx: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
    result_tx: Option<mpsc::Sender<FetchResult>>,
    result_rx: Option<mpsc::Receiver<FetchResult>>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Create a pool of `workers` workers with queues of `queue_size`.
    ///
    /// The pool's token is a child of `parent`, so cancelling the run also
    /// cancels the pool.
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        workers: usize,
        queue_size: usize,
        parent: &CancellationToken,
    ) -> Result<Self> {
        if workers == 0 {
            return Err(AppError::config("worker pool needs at least one worker"));
        }
        if queue_size == 0 {
            return Err(AppError::config("worker pool queue size must be > 0"));
        }

        let (job_tx, job_rx) = mpsc::channel(queue_size);
        let (result_tx, result_rx) = mpsc::channel(queue_size);

        Ok(Self {
            fetcher,
            workers,
            cancel: parent.child_token(),
            job_tx: Some(job_tx),
            job_rx: Arc::new(Mutex::new(job_rx)),
            result_tx: Some(result_tx),
            result_rx: Some(result_rx),
            handles: Vec::with_capacity(workers),
        })
    }

    /// Launch the worker tasks. Calling it again has no effect.
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            return;
        }
        let Some(result_tx) = self.result_tx.as_ref() else {
            return;
        };

        for id in 0..self.workers {
            let worker = Worker {
                id,
                fetcher: Arc::clone(&self.fetcher),
                jobs: Arc::clone(&self.job_rx),
                results: result_tx.clone(),
                cancel: self.cancel.clone(),
            };
            self.handles.push(tokio::spawn(worker.run()));
        }
        log::debug!("Started {} fetch workers", self.workers);
    }

    /// Queue a URL for fetching.
    ///
    /// Waits while the queue is full. Returns `false` without queueing once
    /// the pool is cancelled or stopped.
    pub async fn submit(&self, url: String) -> bool {
        let Some(job_tx) = self.job_tx.as_ref() else {
            return false;
        };
        if self.cancel.is_cancelled() {
            return false;
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = job_tx.send(FetchJob { url }) => sent.is_ok(),
        }
    }

    /// Hand out the result stream. Only the first call gets it.
    pub fn results(&mut self) -> Option<mpsc::Receiver<FetchResult>> {
        self.result_rx.take()
    }

    /// The pool's cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Shut the pool down and wait for every worker to exit.
    ///
    /// Safe to call more than once.
    pub async fn stop(&mut self) {
        // Closing the job queue lets workers drain what is left, then exit.
        self.job_tx.take();

        let handles = std::mem::take(&mut self.handles);
        for joined in join_all(handles).await {
            if let Err(e) = joined {
                log::error!("Fetch worker terminated abnormally: {}", e);
            }
        }

        // Workers hold the remaining senders; the stream closes with this one.
        self.result_tx.take();
        self.cancel.cancel();
    }
}

struct Worker {
    id: usize,
    fetcher: Arc<dyn Fetcher>,
    jobs: Arc<Mutex<mpsc::Receiver<FetchJob>>>,
    results: mpsc::Sender<FetchResult>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        loop {
            let job = {
                let mut jobs = self.jobs.lock().await;
                jobs.recv().await
            };
            let Some(FetchJob { url }) = job else {
                break;
            };

            let body = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(AppError::Cancelled),
                body = self.fetcher.fetch(&self.cancel, &url) => body,
            };
            match &body {
                Err(e) if e.is_cancelled() => {
                    log::trace!("Worker {} abandoned {}", self.id, url);
                }
                Err(e) => log::debug!("Worker {} failed to fetch {}: {}", self.id, url, e),
                Ok(_) => {}
            }

            // Once cancelled nobody may be left to drain a full queue.
            tokio::select! {
                biased;
                _ = self.results.send(FetchResult { url, body }) => {}
                _ = self.cancel.cancelled() => {}
            }
        }
        log::trace!("Worker {} exiting", self.id);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use super::*;
    use crate::testing::StubFetcher;

    fn stub(urls: &[&str], delay: Duration) -> Arc<StubFetcher> {
        let mut fetcher = StubFetcher::new().with_delay(delay);
        for url in urls {
            fetcher = fetcher.page(url, format!("data:{url}"));
        }
        Arc::new(fetcher)
    }

    async fn drain(rx: &mut mpsc::Receiver<FetchResult>) -> Vec<FetchResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn test_pool_success() {
        let urls = ["u1", "u2", "u3", "u4"];
        let fetcher = stub(&urls, Duration::from_millis(10));
        let mut pool = WorkerPool::new(fetcher, 3, 5, &CancellationToken::new()).unwrap();
        let mut rx = pool.results().unwrap();
        pool.start();

        for url in urls {
            assert!(pool.submit(url.to_string()).await);
        }
        pool.stop().await;

        let got: HashMap<String, Vec<u8>> = drain(&mut rx)
            .await
            .into_iter()
            .map(|r| (r.url, r.body.unwrap()))
            .collect();
        assert_eq!(got.len(), urls.len());
        assert_eq!(got["u2"], b"data:u2".to_vec());
    }

    #[tokio::test]
    async fn test_pool_error_is_data() {
        let fetcher = Arc::new(StubFetcher::new().failing("bad", "fetch failed"));
        let mut pool = WorkerPool::new(fetcher, 2, 3, &CancellationToken::new()).unwrap();
        let mut rx = pool.results().unwrap();
        pool.start();

        assert!(pool.submit("bad".to_string()).await);
        pool.stop().await;

        let results = drain(&mut rx).await;
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0].body, Err(AppError::Fetch { .. })));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let fetcher = stub(&[], Duration::ZERO);
        let mut pool = WorkerPool::new(fetcher, 2, 2, &CancellationToken::new()).unwrap();
        let mut rx = pool.results().unwrap();
        pool.start();

        pool.stop().await;
        pool.stop().await;

        assert!(rx.recv().await.is_none());
        assert!(pool.token().is_cancelled());
    }

    #[tokio::test]
    async fn test_submit_after_stop_is_noop() {
        let fetcher = stub(&["u1"], Duration::ZERO);
        let mut pool = WorkerPool::new(fetcher, 1, 1, &CancellationToken::new()).unwrap();
        pool.start();
        pool.stop().await;

        assert!(!pool.submit("u1".to_string()).await);
    }

    #[tokio::test]
    async fn test_submit_on_full_queue_returns_after_cancel() {
        // Workers are never started, so the queue fills up.
        let fetcher = stub(&["u1", "u2"], Duration::ZERO);
        let parent = CancellationToken::new();
        let pool = WorkerPool::new(fetcher, 1, 1, &parent).unwrap();

        assert!(pool.submit("u1".to_string()).await);

        let canceller = parent.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let accepted = tokio::time::timeout(Duration::from_secs(2), pool.submit("u2".into()))
            .await
            .expect("submit should return once cancelled");
        assert!(!accepted);
    }

    #[tokio::test]
    async fn test_stop_without_consumer_does_not_hang() {
        let urls: Vec<String> = (0..20).map(|i| format!("u{i}")).collect();
        let refs: Vec<&str> = urls.iter().map(String::as_str).collect();
        let fetcher = stub(&refs, Duration::from_millis(5));
        let parent = CancellationToken::new();
        let mut pool = WorkerPool::new(fetcher, 2, 2, &parent).unwrap();
        let _rx = pool.results().unwrap();
        pool.start();

        // Fill the job queue; the unread result queue backs up behind it.
        for url in urls.iter().take(3) {
            pool.submit(url.clone()).await;
        }
        parent.cancel();

        tokio::time::timeout(Duration::from_secs(2), pool.stop())
            .await
            .expect("stop should not wait on a full result queue");
    }

    #[tokio::test]
    async fn test_cancel_interrupts_in_flight_fetch() {
        let fetcher = stub(&["slow"], Duration::from_secs(60));
        let parent = CancellationToken::new();
        let mut pool = WorkerPool::new(fetcher, 1, 1, &parent).unwrap();
        let mut rx = pool.results().unwrap();
        pool.start();

        assert!(pool.submit("slow".to_string()).await);
        tokio::time::sleep(Duration::from_millis(20)).await;
        parent.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("cancelled fetch should resolve promptly");
        if let Some(result) = result {
            assert!(result.body.unwrap_err().is_cancelled());
        }
        pool.stop().await;
    }

    #[tokio::test]
    async fn test_rejects_empty_pool() {
        let fetcher = stub(&[], Duration::ZERO);
        assert!(WorkerPool::new(fetcher.clone(), 0, 1, &CancellationToken::new()).is_err());
        assert!(WorkerPool::new(fetcher, 1, 0, &CancellationToken::new()).is_err());
    }
}
