//! URL handling module
//!
//! This module provides host extraction (the admission gate's key) and the
//! host allow-list used to build URL inclusion filters.

mod host;
mod matcher;

use crate::crawler::UrlFilter;
use std::sync::Arc;

pub use host::extract_host;
pub use matcher::HostPattern;

/// Builds a URL filter that accepts only URLs whose host matches one of
/// `patterns`
///
/// An empty pattern list accepts every URL. URLs whose host cannot be
/// extracted are accepted, so that the crawl records them as malformed
/// instead of silently dropping them.
///
/// # Examples
///
/// ```
/// use parallel_crawler::url::host_filter;
///
/// let filter = host_filter(&["*.example.com".to_string()]);
/// assert!(filter("https://blog.example.com/post"));
/// assert!(!filter("https://other.org/"));
/// ```
pub fn host_filter(patterns: &[String]) -> UrlFilter {
    if patterns.is_empty() {
        return Arc::new(|_: &str| true);
    }

    let patterns: Vec<HostPattern> = patterns.iter().map(|p| HostPattern::parse(p)).collect();

    Arc::new(move |url: &str| match extract_host(url) {
        Ok(host) => patterns.iter().any(|pattern| pattern.matches(&host)),
        Err(_) => true,
    })
}
