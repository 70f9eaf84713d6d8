/// A host pattern from the allow-list
///
/// Two forms are supported:
/// 1. Exact: "example.com" matches only "example.com"
/// 2. Wildcard: "*.example.com" matches "example.com" itself and any
///    subdomain of it, at any depth
///
/// Patterns are lowercased when parsed; candidates are expected to come
/// from [`crate::url::extract_host`], which lowercases too.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostPattern {
    Exact(String),
    Suffix(String),
}

impl HostPattern {
    /// Parses a pattern string
    ///
    /// # Examples
    ///
    /// ```
    /// use parallel_crawler::url::HostPattern;
    ///
    /// let pattern = HostPattern::parse("*.Example.com");
    /// assert!(pattern.matches("example.com"));
    /// assert!(pattern.matches("api.v2.example.com"));
    /// assert!(!pattern.matches("example.org"));
    /// ```
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim().to_lowercase();
        match pattern.strip_prefix("*.") {
            Some(base) => Self::Suffix(base.to_string()),
            None => Self::Exact(pattern),
        }
    }

    /// Checks whether `host` is covered by this pattern
    pub fn matches(&self, host: &str) -> bool {
        match self {
            Self::Exact(exact) => host == exact,
            Self::Suffix(base) => {
                host == base
                    || host
                        .strip_suffix(base.as_str())
                        .is_some_and(|prefix| prefix.ends_with('.'))
            }
        }
    }
}
