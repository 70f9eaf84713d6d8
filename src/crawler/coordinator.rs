//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives the traversal. Every URL goes through
//!
//! ```text
//! unseen -> Queued -> Downloading -> Downloaded -> Extracting -> Done
//!              |           |             |             |
//!              +-----------+-------------+-------------+--> Failed
//! ```
//!
//! Each download and each extraction is one unit of work on the completion
//! tracker. A unit is registered before the URL waits on its host's
//! semaphore (in a small task of its own, never in a pool worker) or before
//! a job is handed to a pool. The unit of a download is only released after
//! the extraction unit it spawns has been registered, so the count cannot
//! touch zero while work remains.

use crate::config::{validate_pool_config, CrawlerConfig, ExtractionPolicy};
use crate::crawler::gate::HostGate;
use crate::crawler::pool::WorkerPool;
use crate::crawler::tracker::{CompletionTracker, PendingUnit};
use crate::crawler::{Document, Downloader, UrlFilter};
use crate::state::{CrawlReport, CrawlState, PageState};
use crate::url::extract_host;
use crate::{CrawlError, DownloadError, ExtractError, PageError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;

/// A reusable crawler with its own download and extraction pools
///
/// Must be created inside a tokio runtime. Closing the crawler (explicitly
/// or by dropping it) stops both pools; a crawl in progress then returns
/// [`CrawlError::Closed`].
pub struct WebCrawler<D: Downloader> {
    downloader: Arc<D>,
    downloads: Arc<WorkerPool>,
    extractions: Arc<WorkerPool>,
    per_host: usize,
    policy: ExtractionPolicy,
    filter: UrlFilter,
    shutdown: CancellationToken,
}

impl<D: Downloader> WebCrawler<D> {
    /// Creates a crawler
    ///
    /// # Arguments
    ///
    /// * `downloader` - Fetches documents; shared by all download workers
    /// * `config` - Pool sizes, per-host limit and extraction policy
    ///
    /// # Returns
    ///
    /// * `Ok(WebCrawler)` - Pools are running
    /// * `Err(CrawlError)` - A pool size or the per-host limit was zero, or no
    ///   tokio runtime is active
    ///
    /// `config.max_depth` is not read here; the depth is given per crawl.
    pub fn new(downloader: D, config: &CrawlerConfig) -> Result<Self, CrawlError> {
        validate_pool_config(config)?;
        tokio::runtime::Handle::try_current()?;

        let shutdown = CancellationToken::new();
        let downloads = WorkerPool::new("download", config.downloaders, shutdown.child_token());
        let extractions = WorkerPool::new("extraction", config.extractors, shutdown.child_token());

        Ok(Self {
            downloader: Arc::new(downloader),
            downloads: Arc::new(downloads),
            extractions: Arc::new(extractions),
            per_host: config.per_host,
            policy: config.extraction_policy,
            filter: Arc::new(|_: &str| true),
            shutdown,
        })
    }

    /// Restricts which discovered URLs are crawled (the seed included)
    pub fn with_filter(mut self, filter: UrlFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Crawls from `url`, following links up to `max_depth` levels
    ///
    /// Depth 1 downloads only `url`. Depth 0 does nothing. Individual page
    /// failures never fail the crawl; they are listed in the report.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - Downloaded URLs and per-URL failures
    /// * `Err(CrawlError::Closed)` - The crawler was closed before or during the crawl
    pub async fn crawl(&self, url: &str, max_depth: usize) -> Result<CrawlReport, CrawlError> {
        if self.is_closed() {
            return Err(CrawlError::Closed);
        }

        if max_depth == 0 {
            tracing::debug!("Depth 0 requested for {}, nothing to do", url);
            return Ok(CrawlReport::default());
        }

        tracing::info!("Starting crawl of {} (max depth {})", url, max_depth);
        let start_time = Instant::now();

        let run = Arc::new(CrawlRun {
            downloader: Arc::clone(&self.downloader),
            downloads: Arc::clone(&self.downloads),
            extractions: Arc::clone(&self.extractions),
            policy: self.policy,
            filter: Arc::clone(&self.filter),
            gate: HostGate::new(self.per_host),
            state: CrawlState::new(),
            tracker: CompletionTracker::new(),
        });

        let root = run.tracker.register();
        run.enqueue(url.to_string(), max_depth);
        drop(root);

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                tracing::warn!(
                    "Crawl of {} interrupted after {} URLs",
                    url,
                    run.state.visited()
                );
                // URLs waiting on a host hold the run alive; wake them
                run.gate.close();
                return Err(CrawlError::Closed);
            }
            _ = run.tracker.quiescent() => {}
        }

        let failed = run.state.failed();
        let report = run.state.take_report();
        tracing::info!(
            "Crawl of {} completed: {} downloaded, {} failed, {} hosts in {:?}",
            url,
            report.downloaded.len(),
            failed,
            run.gate.hosts(),
            start_time.elapsed()
        );

        Ok(report)
    }

    /// Stops both pools; idempotent and safe during a crawl
    pub fn close(&self) {
        if !self.shutdown.is_cancelled() {
            tracing::debug!("Closing crawler");
        }
        self.shutdown.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl<D: Downloader> Drop for WebCrawler<D> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// State of one `crawl` call, shared by every job it spawns
struct CrawlRun<D: Downloader> {
    downloader: Arc<D>,
    downloads: Arc<WorkerPool>,
    extractions: Arc<WorkerPool>,
    policy: ExtractionPolicy,
    filter: UrlFilter,
    gate: HostGate,
    state: CrawlState,
    tracker: Arc<CompletionTracker>,
}

impl<D: Downloader> CrawlRun<D> {
    /// Evaluates a discovered URL: filter, claim, then ask for a host slot
    fn enqueue(self: &Arc<Self>, url: String, depth: usize) {
        if depth == 0 {
            return;
        }

        if !(self.filter)(&url) {
            tracing::trace!("Filtered out {}", url);
            return;
        }

        if !self.state.claim(&url) {
            tracing::trace!("Already visited {}", url);
            return;
        }

        let host = match extract_host(&url) {
            Ok(host) => host,
            Err(e) => {
                self.state.fail(&url, PageError::InvalidUrl(e));
                return;
            }
        };

        tracing::debug!("Queued {} (depth {})", url, depth);
        let unit = self.tracker.register();
        let run = Arc::clone(self);
        tokio::spawn(async move {
            // None means the gate closed; dropping the unit is all that is left
            if let Some(permit) = run.gate.acquire(&host).await {
                run.dispatch_download(url, depth, permit, unit);
            }
        });
    }

    /// Hands an admitted URL to the download pool
    fn dispatch_download(
        self: Arc<Self>,
        url: String,
        depth: usize,
        permit: OwnedSemaphorePermit,
        unit: PendingUnit,
    ) {
        let run = Arc::clone(&self);
        let job_url = url.clone();
        let submitted = self
            .downloads
            .submit(async move { run.download(job_url, depth, permit, unit).await });

        if let Err(rejected) = submitted {
            // Closed pool: release everything still waiting for a host
            self.gate.close();
            self.state.fail(&url, PageError::Rejected { pool: rejected.pool });
            drop(rejected);
        }
    }

    async fn download(
        self: Arc<Self>,
        url: String,
        depth: usize,
        permit: OwnedSemaphorePermit,
        unit: PendingUnit,
    ) {
        self.state.advance(&url, PageState::Downloading);
        tracing::debug!("Downloading {}", url);

        // A panicking downloader fails this URL only. The handle aborts the
        // fetch if this job is itself aborted on close.
        let downloader = Arc::clone(&self.downloader);
        let target = url.clone();
        let fetch = AbortOnDropHandle::new(tokio::spawn(async move {
            downloader.download(&target).await
        }));
        let result = fetch
            .await
            .unwrap_or_else(|e| Err(DownloadError::Other(format!("download task failed: {}", e))));
        // Extraction does not hold the host slot
        drop(permit);

        match result {
            Err(e) => self.state.fail(&url, PageError::Download(e)),
            Ok(document) => {
                self.state.advance(&url, PageState::Downloaded);
                if depth > 1 {
                    self.dispatch_extraction(url, document, depth);
                } else {
                    self.state.advance(&url, PageState::Done);
                }
            }
        }

        drop(unit);
    }

    /// Registers the extraction unit and hands the document to the extraction pool
    fn dispatch_extraction(self: &Arc<Self>, url: String, document: D::Document, depth: usize) {
        let unit = self.tracker.register();
        self.state.advance(&url, PageState::Extracting);

        let run = Arc::clone(self);
        let job_url = url.clone();
        let submitted = self
            .extractions
            .submit(async move { run.extract(job_url, document, depth, unit).await });

        if let Err(rejected) = submitted {
            self.state.fail(&url, PageError::Rejected { pool: rejected.pool });
            drop(rejected);
        }
    }

    async fn extract(self: Arc<Self>, url: String, document: D::Document, depth: usize, unit: PendingUnit) {
        tracing::debug!("Extracting links from {}", url);

        let outcome = tokio::task::spawn_blocking(move || document.extract_links())
            .await
            .unwrap_or_else(|e| Err(ExtractError::new(format!("extraction task failed: {}", e))));

        match outcome {
            Ok(links) => {
                tracing::debug!("Found {} links on {}", links.len(), url);
                for link in links {
                    self.enqueue(link, depth - 1);
                }
                self.state.advance(&url, PageState::Done);
            }
            Err(error) => {
                if self.policy == ExtractionPolicy::KeepPartial {
                    tracing::debug!(
                        "Following {} links recovered from {} before extraction failed",
                        error.recovered.len(),
                        url
                    );
                    for link in &error.recovered {
                        self.enqueue(link.clone(), depth - 1);
                    }
                }
                self.state.fail(&url, PageError::Extract(error));
            }
        }

        drop(unit);
    }
}
