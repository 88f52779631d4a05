//! Stub collaborators for exercising the pool and orchestrator without
//! network, DOM or disk work.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::PageData;
use crate::services::{Fetcher, Parser};
use crate::storage::{MemoryStorage, PageStorage};
use crate::utils::resolve_url;
use crate::utils::url::get_host;

/// Serves canned bodies and records every URL it was asked for.
#[derive(Default)]
pub struct StubFetcher {
    pages: HashMap<String, std::result::Result<Vec<u8>, String>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every fetch by `delay`, unless cancelled first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), Ok(body.into()));
        self
    }

    pub fn failing(mut self, url: &str, message: &str) -> Self {
        self.pages.insert(url.to_string(), Err(message.to_string()));
        self
    }

    /// URLs fetched so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, cancel: &CancellationToken, url: &str) -> Result<Vec<u8>> {
        self.calls.lock().unwrap().push(url.to_string());

        if !self.delay.is_zero() {
            tokio::select! {
                _ = cancel.cancelled() => return Err(AppError::Cancelled),
                _ = sleep(self.delay) => {}
            }
        }

        match self.pages.get(url) {
            Some(Ok(body)) => Ok(body.clone()),
            Some(Err(message)) => Err(AppError::fetch(url, message)),
            None => Err(AppError::fetch(url, "404 not found")),
        }
    }
}

/// Reads bodies written as a title line followed by one link per line.
/// Relative links resolve against the page URL. A body starting with `!` is
/// rejected as unparseable.
#[derive(Default)]
pub struct StubParser;

impl StubParser {
    /// Build a body this parser understands.
    pub fn body(title: &str, links: &[&str]) -> Vec<u8> {
        let mut lines = vec![title.to_string()];
        lines.extend(links.iter().map(|l| l.to_string()));
        lines.join("\n").into_bytes()
    }
}

impl Parser for StubParser {
    fn parse(&self, page_url: &str, body: &[u8]) -> Result<PageData> {
        let text = String::from_utf8_lossy(body);
        if text.starts_with('!') {
            return Err(AppError::parse("malformed page"));
        }

        let mut lines = text.lines();
        let mut data = PageData {
            title: lines.next().unwrap_or_default().to_string(),
            ..PageData::default()
        };
        let base = Url::parse(page_url)?;
        let host = get_host(page_url);
        for link in lines
            .filter(|l| !l.trim().is_empty())
            .filter_map(|l| resolve_url(&base, l))
        {
            if get_host(link.as_str()) == host {
                data.internal_links.push(link.into());
            } else {
                data.external_links.push(link.into());
            }
        }
        Ok(data)
    }
}

/// Storage whose writes always fail.
#[derive(Default)]
pub struct FailingStorage;

#[async_trait]
impl PageStorage for FailingStorage {
    async fn save_page(&self, url: &str, _data: &PageData) -> Result<()> {
        Err(AppError::storage(format!("disk full while saving {url}")))
    }

    async fn search_pages(&self, _keyword: &str) -> Result<Vec<String>> {
        Err(AppError::storage("database unavailable"))
    }

    async fn clear(&self) -> Result<()> {
        Err(AppError::storage("database unavailable"))
    }
}

/// In-memory storage that takes `delay` for every save.
pub struct SlowStorage {
    inner: MemoryStorage,
    delay: Duration,
}

impl SlowStorage {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStorage::new(),
            delay,
        }
    }
}

#[async_trait]
impl PageStorage for SlowStorage {
    async fn save_page(&self, url: &str, data: &PageData) -> Result<()> {
        sleep(self.delay).await;
        self.inner.save_page(url, data).await
    }

    async fn search_pages(&self, keyword: &str) -> Result<Vec<String>> {
        self.inner.search_pages(keyword).await
    }

    async fn clear(&self) -> Result<()> {
        self.inner.clear().await
    }
}
