//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// HTTP API settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Page persistence settings
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        self.crawler.validate()?;
        if self.server.bind.trim().is_empty() {
            return Err(AppError::validation("server.bind is empty"));
        }
        if self.storage.backend == StorageBackend::Local
            && self.storage.dir.as_os_str().is_empty()
        {
            return Err(AppError::validation("storage.dir is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Number of concurrent fetch workers
    #[serde(default = "defaults::workers")]
    pub workers: usize,

    /// Capacity of the job queue and of the result queue
    #[serde(default = "defaults::queue_size")]
    pub queue_size: usize,

    /// Link depth followed from the seeds when none is given
    #[serde(default = "defaults::max_depth")]
    pub max_depth: usize,

    /// Largest response body accepted by the HTTP fetcher
    #[serde(default = "defaults::max_body_bytes")]
    pub max_body_bytes: usize,
}

impl CrawlerConfig {
    /// Validate the settings a worker pool depends on.
    pub fn validate(&self) -> Result<()> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.workers == 0 {
            return Err(AppError::validation("crawler.workers must be > 0"));
        }
        if self.queue_size == 0 {
            return Err(AppError::validation("crawler.queue_size must be > 0"));
        }
        if self.max_body_bytes == 0 {
            return Err(AppError::validation("crawler.max_body_bytes must be > 0"));
        }
        Ok(())
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            workers: defaults::workers(),
            queue_size: defaults::queue_size(),
            max_depth: defaults::max_depth(),
            max_body_bytes: defaults::max_body_bytes(),
        }
    }
}

/// HTTP API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address the API binds to (host:port)
    #[serde(default = "defaults::bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::bind(),
        }
    }
}

/// Which storage backend keeps crawled pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// JSON file on the local filesystem
    #[default]
    Local,
    /// In-process only, lost on exit
    Memory,
}

/// Page persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StorageBackend,

    /// Directory for the local backend
    #[serde(default = "defaults::storage_dir")]
    pub dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            dir: defaults::storage_dir(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; sitecrawler/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn workers() -> usize {
        5
    }
    pub fn queue_size() -> usize {
        100
    }
    pub fn max_depth() -> usize {
        2
    }
    pub fn max_body_bytes() -> usize {
        5 * 1024 * 1024
    }

    // Server defaults
    pub fn bind() -> String {
        "127.0.0.1:8080".into()
    }

    // Storage defaults
    pub fn storage_dir() -> PathBuf {
        PathBuf::from("storage")
    }
}
