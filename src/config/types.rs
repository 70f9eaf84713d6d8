use serde::Deserialize;

/// Main configuration structure for the crawler
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Maximum depth to crawl; 1 downloads only the seed
    #[serde(rename = "max-depth")]
    pub max_depth: usize,

    /// Number of download workers
    pub downloaders: usize,

    /// Number of link extraction workers
    pub extractors: usize,

    /// Maximum number of concurrent downloads per host
    #[serde(rename = "per-host")]
    pub per_host: usize,

    /// What to do with links recovered from a page whose extraction failed
    #[serde(rename = "extraction-policy")]
    pub extraction_policy: ExtractionPolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            downloaders: 2,
            extractors: 2,
            per_host: 10,
            extraction_policy: ExtractionPolicy::default(),
        }
    }
}

/// Handling of pages whose link extraction fails part-way
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionPolicy {
    /// Follow none of the page's links
    #[default]
    Discard,

    /// Follow the links recovered before the failure, then record it
    KeepPartial,
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    /// Name of the crawler
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url")]
    pub contact_url: String,

    /// Email address for crawler-related contact
    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: env!("CARGO_PKG_NAME").to_string(),
            crawler_version: env!("CARGO_PKG_VERSION").to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }
}

/// URL inclusion rules
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterConfig {
    /// Host patterns (e.g., "example.com" or "*.example.com"); empty allows all
    #[serde(default)]
    pub hosts: Vec<String>,
}
