// src/models/mod.rs

//! Domain models for the crawler.
//!
//! This module contains the data structures shared by the worker pool, the
//! crawl orchestrator and the collaborators.

mod config;
mod page;
mod stats;

// Re-export all public types
pub use config::{Config, CrawlerConfig, ServerConfig, StorageBackend, StorageConfig};
pub use page::{PageData, PageRecord};
pub use stats::{CrawlStats, RunState};
