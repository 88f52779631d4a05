//! Crawled page data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What the parser extracts from one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageData {
    /// Trimmed `<title>` text, empty when missing
    pub title: String,

    /// Absolute links on the same host as the crawl, in document order
    pub internal_links: Vec<String>,

    /// Absolute links to other hosts, in document order
    pub external_links: Vec<String>,
}

/// A persisted page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageRecord {
    /// Normalized page URL, the storage key
    pub url: String,

    /// Page title, copied out of `data` for searching
    pub title: String,

    /// Full parser output
    pub data: PageData,

    /// When the page was stored
    pub crawled_at: DateTime<Utc>,
}

impl PageRecord {
    pub fn new(url: impl Into<String>, data: &PageData) -> Self {
        Self {
            url: url.into(),
            title: data.title.clone(),
            data: data.clone(),
            crawled_at: Utc::now(),
        }
    }

    /// Case-insensitive keyword match on title or URL.
    ///
    /// An empty keyword matches every page.
    pub fn matches(&self, keyword: &str) -> bool {
        let keyword = keyword.trim().to_lowercase();
        keyword.is_empty()
            || self.title.to_lowercase().contains(&keyword)
            || self.url.to_lowercase().contains(&keyword)
    }
}
