//! Collaborator interfaces consumed by the crawler
//!
//! The crawler never fetches or parses anything itself. It is handed a
//! [`Downloader`] that turns a URL into a [`Document`], and asks each
//! document for its outgoing links.

use crate::{DownloadError, ExtractError};
use async_trait::async_trait;
use std::sync::Arc;

/// Fetches documents by URL
///
/// Implementations must tolerate concurrent calls from many workers, and
/// are responsible for their own timeouts.
#[async_trait]
pub trait Downloader: Send + Sync + 'static {
    /// The document type produced by a successful download
    type Document: Document;

    /// Downloads `url`
    async fn download(&self, url: &str) -> Result<Self::Document, DownloadError>;
}

/// A downloaded page
pub trait Document: Send + 'static {
    /// Produces the absolute URLs this document links to
    ///
    /// Called at most once per document, on a blocking thread, so it may be
    /// CPU-heavy.
    fn extract_links(&self) -> Result<Vec<String>, ExtractError>;
}

/// Predicate deciding whether a discovered URL is eligible for crawling
pub type UrlFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

#[async_trait]
impl<D: Downloader> Downloader for Arc<D> {
    type Document = D::Document;

    async fn download(&self, url: &str) -> Result<Self::Document, DownloadError> {
        (**self).download(url).await
    }
}
