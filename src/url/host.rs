use crate::{UrlError, UrlResult};
use url::Url;

/// Extracts the lowercase host from an absolute URL string
///
/// This is the key used by the per-host admission gate. A URL that does not
/// parse, or parses without a host (e.g. `mailto:`), is an error.
///
/// # Examples
///
/// ```
/// use parallel_crawler::url::extract_host;
///
/// assert_eq!(extract_host("https://EXAMPLE.com:8080/path").unwrap(), "example.com");
/// assert!(extract_host("not a url").is_err());
/// assert!(extract_host("mailto:someone@example.com").is_err());
/// ```
pub fn extract_host(url: &str) -> UrlResult<String> {
    let parsed = Url::parse(url).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
    parsed
        .host_str()
        .filter(|host| !host.is_empty())
        .map(|host| host.to_lowercase())
        .ok_or(UrlError::MissingHost)
}
