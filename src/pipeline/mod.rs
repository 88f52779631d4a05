//! Crawl pipeline.
//!
//! - `pool`: bounded fetch workers
//! - `crawl`: breadth-first orchestration of one run
//! - `controller`: start/stop/status across runs

pub mod controller;
pub mod crawl;
pub mod pool;

pub use controller::CrawlController;
pub use crawl::{Crawl, RunMonitor};
pub use pool::{FetchJob, FetchResult, WorkerPool};
