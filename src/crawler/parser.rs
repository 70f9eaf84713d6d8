//! HTML documents and link extraction
//!
//! Link extraction rules:
//!
//! **Include:**
//! - `<a href="...">` tags
//! - `<link rel="canonical" href="...">`
//!
//! **Exclude:**
//! - `<a href="..." download>`
//! - `javascript:`, `mailto:`, `tel:` and `data:` links
//! - same-page anchors and anything not http(s) after resolution
//!
//! Fragments are stripped so `page#a` and `page#b` are the same URL.

use crate::crawler::Document;
use crate::ExtractError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// A downloaded, already decoded page body with the URL it was served from
#[derive(Debug, Clone)]
pub struct HtmlDocument {
    base_url: Url,
    content_type: Option<String>,
    body: String,
}

impl HtmlDocument {
    /// Creates a document
    ///
    /// `base_url` is the final URL after redirects; relative links resolve
    /// against it.
    pub fn new(base_url: Url, content_type: Option<String>, body: impl Into<String>) -> Self {
        Self {
            base_url,
            content_type,
            body: body.into(),
        }
    }

    /// True when the content type is HTML or unknown
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
            .unwrap_or(true)
    }
}

impl Document for HtmlDocument {
    /// Extracts links from the body; non-HTML content has no links
    ///
    /// The HTML parser recovers from malformed markup, so this never fails.
    fn extract_links(&self) -> Result<Vec<String>, ExtractError> {
        if !self.is_html() {
            return Ok(Vec::new());
        }

        Ok(parse_links(&self.body, &self.base_url))
    }
}

/// Parses HTML and returns its absolute, de-duplicated links in document order
///
/// # Example
///
/// ```
/// use parallel_crawler::crawler::parse_links;
/// use url::Url;
///
/// let html = r#"<a href="/page#top">Link</a><a href="mailto:me@example.com">Mail</a>"#;
/// let base_url = Url::parse("https://example.com/").unwrap();
/// assert_eq!(parse_links(html, &base_url), vec!["https://example.com/page"]);
/// ```
pub fn parse_links(html: &str, base_url: &Url) -> Vec<String> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    let mut push = |href: &str| {
        if let Some(absolute) = resolve_link(href, base_url) {
            if seen.insert(absolute.clone()) {
                links.push(absolute);
            }
        }
    };

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if element.value().attr("download").is_some() {
                continue;
            }
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    if let Ok(canonical_selector) = Selector::parse("link[rel='canonical'][href]") {
        for element in document.select(&canonical_selector) {
            if let Some(href) = element.value().attr("href") {
                push(href);
            }
        }
    }

    links
}

/// Resolves an href against the page URL, or `None` if it is not followable
fn resolve_link(href: &str, base_url: &Url) -> Option<String> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut absolute = base_url.join(href).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }
    absolute.set_fragment(None);

    Some(absolute.to_string())
}
