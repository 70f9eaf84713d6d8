//! Parallel-Crawler: a bounded, depth-limited concurrent web crawler
//!
//! This crate walks the link graph breadth-first from a seed URL, downloading
//! pages and extracting their links on two independent worker pools while
//! capping concurrent downloads per host and visiting every URL at most once.

pub mod config;
pub mod crawler;
pub mod state;
pub mod url;

use thiserror::Error;

/// Main error type for crawler operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Crawler has been closed")]
    Closed,

    #[error("No tokio runtime available: {0}")]
    Runtime(#[from] tokio::runtime::TryCurrentError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid host pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Failure raised by a [`crawler::Downloader`]
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("Request timeout")]
    Timeout,

    #[error("{0}")]
    Other(String),
}

/// Failure raised by [`crawler::Document::extract_links`]
///
/// `recovered` carries the links the document managed to produce before it
/// failed. Whether they are followed depends on the crawler's
/// [`config::ExtractionPolicy`].
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ExtractError {
    pub message: String,
    pub recovered: Vec<String>,
}

impl ExtractError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            recovered: Vec::new(),
        }
    }

    /// An extraction failure that still yielded some links
    pub fn partial(message: impl Into<String>, recovered: Vec<String>) -> Self {
        Self {
            message: message.into(),
            recovered,
        }
    }
}

/// Why a single URL ended up in the error map of a crawl report
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] UrlError),

    #[error("Download failed: {0}")]
    Download(#[from] DownloadError),

    #[error("Link extraction failed: {0}")]
    Extract(#[from] ExtractError),

    #[error("Task rejected by the {pool} pool")]
    Rejected { pool: &'static str },
}

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::{Config, CrawlerConfig, ExtractionPolicy};
pub use crawler::{CrawlReport, Document, Downloader, UrlFilter, WebCrawler};
pub use state::PageState;
pub use url::{extract_host, host_filter};
