//! HTTP downloader
//!
//! This module provides the stock [`Downloader`]: a reqwest client with a
//! descriptive user agent, request/connect timeouts and a redirect cap.
//! Any non-2xx status is a download failure; no request is retried. Bodies
//! are decoded to text using the charset the server declares, with invalid
//! sequences replaced rather than rejected.

use crate::config::UserAgentConfig;
use crate::crawler::parser::HtmlDocument;
use crate::crawler::Downloader;
use crate::DownloadError;
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use parallel_crawler::config::UserAgentConfig;
/// use parallel_crawler::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent(config))
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
fn user_agent(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// Downloads pages over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    client: Client,
}

impl HttpDownloader {
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    type Document = HtmlDocument;

    async fn download(&self, url: &str) -> Result<HtmlDocument, DownloadError> {
        let response = self.client.get(url).send().await.map_err(classify)?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(classify)?;
        tracing::trace!("Fetched {} ({} bytes)", final_url, body.len());

        Ok(HtmlDocument::new(final_url, content_type, body))
    }
}

fn classify(error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::Timeout
    } else {
        DownloadError::Http(error)
    }
}
