//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The [`Downloader`] and [`Document`] seams and their HTTP/HTML implementations
//! - Worker pools for downloads and link extraction
//! - Per-host admission and completion tracking
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod gate;
mod parser;
mod pool;
mod tracker;
mod traits;

pub use coordinator::WebCrawler;
pub use fetcher::{build_http_client, HttpDownloader};
pub use gate::HostGate;
pub use parser::{parse_links, HtmlDocument};
pub use pool::{Job, Rejected, WorkerPool};
pub use tracker::{CompletionTracker, PendingUnit};
pub use traits::{Document, Downloader, UrlFilter};

pub use crate::state::CrawlReport;
