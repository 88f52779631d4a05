//! In-memory storage implementation.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PageData, PageRecord};
use crate::storage::{PageStorage, search_records};

/// Storage that keeps pages in a process-local map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    pages: Mutex<BTreeMap<String, PageRecord>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored pages.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Stored record for a URL, if any.
    pub fn get(&self, url: &str) -> Option<PageRecord> {
        self.lock().get(url).cloned()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, PageRecord>> {
        self.pages.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PageStorage for MemoryStorage {
    async fn save_page(&self, url: &str, data: &PageData) -> Result<()> {
        self.lock()
            .insert(url.to_string(), PageRecord::new(url, data));
        Ok(())
    }

    async fn search_pages(&self, keyword: &str) -> Result<Vec<String>> {
        Ok(search_records(self.lock().values(), keyword))
    }

    async fn clear(&self) -> Result<()> {
        self.lock().clear();
        Ok(())
    }
}
