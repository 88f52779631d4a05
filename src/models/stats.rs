//! Crawl run statistics.

use serde::{Deserialize, Serialize};

/// Counters for one crawl run.
///
/// Values handed out by the controller are snapshots; mutating one has no
/// effect on the run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// Pages fetched successfully
    pub fetched: usize,

    /// Fetches that failed
    pub errors: usize,

    /// Jobs submitted and not yet resolved
    pub queued: usize,

    /// Fetched pages the parser rejected
    pub parse_errors: usize,

    /// Parsed pages the storage layer failed to persist
    pub storage_errors: usize,

    /// Pages persisted
    pub stored: usize,
}

impl CrawlStats {
    /// Jobs resolved so far, successfully or not.
    pub fn resolved(&self) -> usize {
        self.fetched + self.errors
    }
}

/// Lifecycle state of the crawl controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    /// No run active
    #[default]
    Idle,
    /// BFS loop consuming results
    Running,
    /// Stop requested, pool shutting down
    Draining,
}
