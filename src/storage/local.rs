//! Local filesystem storage implementation.
//!
//! Pages live in a JSON-lines log, one compact [`PageRecord`] per line. A
//! save appends a single line; when a URL is saved again the later line
//! wins. The log is read on first use, kept in memory, and rewritten
//! without superseded lines when loading finds any.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── pages.jsonl           # One PageRecord per line, append-only
//! └── pages.tmp             # Transient, during compaction and clear only
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{PageData, PageRecord};
use crate::storage::{PageStorage, search_records};

const PAGES_KEY: &str = "pages.jsonl";

/// Local filesystem storage backend.
pub struct LocalStorage {
    root_dir: PathBuf,
    // None until the log has been read from disk
    pages: Mutex<Option<BTreeMap<String, PageRecord>>>,
}

impl LocalStorage {
    /// Create a new LocalStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            pages: Mutex::new(None),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// Append bytes to a file, creating it if needed.
    async fn append_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Replay the log. Compacts it on disk when some lines were superseded.
    async fn load_log(&self) -> Result<BTreeMap<String, PageRecord>> {
        let Some(bytes) = self.read_bytes(PAGES_KEY).await? else {
            return Ok(BTreeMap::new());
        };

        let mut pages = BTreeMap::new();
        let mut lines = 0;
        for line in bytes.split(|b| *b == b'\n') {
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            let record: PageRecord = serde_json::from_slice(line)?;
            pages.insert(record.url.clone(), record);
            lines += 1;
        }

        if lines > pages.len() {
            log::debug!(
                "Compacting {}: {} lines, {} pages",
                self.path(PAGES_KEY).display(),
                lines,
                pages.len()
            );
            self.write_bytes(PAGES_KEY, &encode_lines(pages.values())?)
                .await?;
        }
        log::debug!(
            "Loaded {} pages from {}",
            pages.len(),
            self.path(PAGES_KEY).display()
        );
        Ok(pages)
    }
}

/// Serialize records as compact JSON, one per line.
fn encode_lines<'a>(records: impl IntoIterator<Item = &'a PageRecord>) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.push(b'\n');
    }
    Ok(out)
}

#[async_trait]
impl PageStorage for LocalStorage {
    async fn save_page(&self, url: &str, data: &PageData) -> Result<()> {
        let mut guard = self.pages.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_log().await?);
        }
        let Some(pages) = guard.as_mut() else {
            return Err(AppError::storage("page cache unavailable"));
        };

        let record = PageRecord::new(url, data);
        let line = encode_lines([&record])?;
        self.append_bytes(PAGES_KEY, &line)
            .await
            .map_err(|e| AppError::storage(format!("failed to append to {PAGES_KEY}: {e}")))?;
        pages.insert(url.to_string(), record);
        Ok(())
    }

    async fn search_pages(&self, keyword: &str) -> Result<Vec<String>> {
        let mut guard = self.pages.lock().await;
        if guard.is_none() {
            *guard = Some(self.load_log().await?);
        }
        Ok(guard
            .as_ref()
            .map(|pages| search_records(pages.values(), keyword))
            .unwrap_or_default())
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.pages.lock().await;
        self.write_bytes(PAGES_KEY, b"").await?;
        *guard = Some(BTreeMap::new());
        log::info!("Cleared stored pages in {}", self.root_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn page(title: &str) -> PageData {
        PageData {
            title: title.to_string(),
            internal_links: vec!["http://example.com/next".to_string()],
            external_links: vec![],
        }
    }

    fn log_lines(tmp: &TempDir) -> Vec<String> {
        std::fs::read_to_string(tmp.path().join(PAGES_KEY))
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        storage.write_bytes("test.txt", b"hello").await.unwrap();
        storage.append_bytes("test.txt", b" world").await.unwrap();
        let data = storage.read_bytes("test.txt").await.unwrap();
        assert_eq!(data, Some(b"hello world".to_vec()));
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        let data = storage.read_bytes("nope.txt").await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_pages_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let storage = LocalStorage::new(tmp.path());
            storage
                .save_page("http://example.com/", &page("Home"))
                .await
                .unwrap();
            storage
                .save_page("http://example.com/about", &page("About"))
                .await
                .unwrap();
        }

        let reopened = LocalStorage::new(tmp.path());
        assert_eq!(
            reopened.search_pages("").await.unwrap(),
            vec!["http://example.com/", "http://example.com/about"]
        );
        assert_eq!(
            reopened.search_pages("ABOUT").await.unwrap(),
            vec!["http://example.com/about"]
        );
    }

    #[tokio::test]
    async fn test_each_save_appends_one_compact_line() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());

        for i in 0..50 {
            storage
                .save_page(&format!("http://example.com/p{i}"), &page("Page"))
                .await
                .unwrap();
        }

        let lines = log_lines(&tmp);
        assert_eq!(lines.len(), 50);
        let first: PageRecord = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.url, "http://example.com/p0");
        assert_eq!(first.data.internal_links.len(), 1);
        assert!(!lines[0].contains("\n  "));
        assert!(!tmp.path().join("pages.tmp").exists());
    }

    #[tokio::test]
    async fn test_resave_wins_and_log_compacts_on_load() {
        let tmp = TempDir::new().unwrap();
        {
            let storage = LocalStorage::new(tmp.path());
            storage
                .save_page("http://example.com/", &page("Old"))
                .await
                .unwrap();
            storage
                .save_page("http://example.com/", &page("New"))
                .await
                .unwrap();
        }
        assert_eq!(log_lines(&tmp).len(), 2);

        let reopened = LocalStorage::new(tmp.path());
        assert!(reopened.search_pages("old").await.unwrap().is_empty());
        assert_eq!(
            reopened.search_pages("new").await.unwrap(),
            vec!["http://example.com/"]
        );
        assert_eq!(log_lines(&tmp).len(), 1);
    }

    #[tokio::test]
    async fn test_clear() {
        let tmp = TempDir::new().unwrap();
        let storage = LocalStorage::new(tmp.path());
        storage
            .save_page("http://example.com/", &page("Home"))
            .await
            .unwrap();
        storage.clear().await.unwrap();

        assert!(storage.search_pages("").await.unwrap().is_empty());
        let reopened = LocalStorage::new(tmp.path());
        assert!(reopened.search_pages("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_log_is_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(PAGES_KEY), b"not json\n").unwrap();
        let storage = LocalStorage::new(tmp.path());

        assert!(storage.search_pages("").await.is_err());
    }
}
