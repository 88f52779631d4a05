// src/error.rs

//! Unified error handling for the crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// A raw URL could not be parsed
    #[error("Invalid URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    /// Network or transport failure while fetching a page
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// The server answered with a non-success status
    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    /// Page content could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Persistence layer failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// The operation was cancelled by a stop request
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// HTTP API server error
    #[error("Server error: {0}")]
    Server(String),
}

impl AppError {
    /// Create an invalid URL error.
    pub fn invalid_url(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl fmt::Display) -> Self {
        Self::Parse(message.to_string())
    }

    /// Create a storage error.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a server error.
    pub fn server(message: impl fmt::Display) -> Self {
        Self::Server(message.to_string())
    }

    /// Whether this error came from a cancelled operation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = AppError::fetch("http://example.com/", "connection refused");
        assert_eq!(
            err.to_string(),
            "Fetch failed for http://example.com/: connection refused"
        );

        let err = AppError::HttpStatus {
            url: "http://example.com/missing".into(),
            status: 404,
        };
        assert_eq!(err.to_string(), "HTTP 404 for http://example.com/missing");
    }

    #[test]
    fn test_is_cancelled() {
        assert!(AppError::Cancelled.is_cancelled());
        assert!(!AppError::parse("bad").is_cancelled());
    }
}
