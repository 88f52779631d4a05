//! Storage abstractions for crawled pages.
//!
//! Two backends implement [`PageStorage`]:
//! - [`MemoryStorage`]: in-process map, lost on exit
//! - [`LocalStorage`]: an append-only `pages.jsonl` log in a directory
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── config.toml           # Crawler configuration
//! └── pages.jsonl           # Persisted pages, one JSON record per line
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PageData, PageRecord};

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Upper bound on URLs returned by a search.
pub const SEARCH_LIMIT: usize = 100;

/// Trait for page storage backends.
#[async_trait]
pub trait PageStorage: Send + Sync {
    /// Insert or replace the page stored under `url`.
    async fn save_page(&self, url: &str, data: &PageData) -> Result<()>;

    /// URLs of pages whose title or URL contains `keyword`, case-insensitive.
    ///
    /// An empty keyword lists all pages. At most [`SEARCH_LIMIT`] URLs are
    /// returned, sorted.
    async fn search_pages(&self, keyword: &str) -> Result<Vec<String>>;

    /// Remove every stored page.
    async fn clear(&self) -> Result<()>;
}

/// Shared search over an already URL-sorted sequence of records.
pub(crate) fn search_records<'a>(
    records: impl IntoIterator<Item = &'a PageRecord>,
    keyword: &str,
) -> Vec<String> {
    records
        .into_iter()
        .filter(|record| record.matches(keyword))
        .take(SEARCH_LIMIT)
        .map(|record| record.url.clone())
        .collect()
}
