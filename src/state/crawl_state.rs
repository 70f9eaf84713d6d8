use crate::state::PageState;
use crate::PageError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;

/// Final outcome of one crawl
#[derive(Debug, Default)]
pub struct CrawlReport {
    /// URLs downloaded (and, if depth allowed, extracted) without error
    pub downloaded: Vec<String>,

    /// URLs that failed, with the reason
    pub errors: HashMap<String, PageError>,
}

impl CrawlReport {
    /// Number of distinct URLs the crawl claimed
    pub fn visited(&self) -> usize {
        self.downloaded.len() + self.errors.len()
    }
}

/// Shared per-crawl state: the visited set and the error map
///
/// Both maps are safe to touch from any worker. A URL enters `pages` at most
/// once, and `errors` holds at most one reason per URL.
#[derive(Debug, Default)]
pub struct CrawlState {
    pages: DashMap<String, PageState>,
    errors: DashMap<String, PageError>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url` for this crawl
    ///
    /// Returns `true` for exactly one caller per URL; that caller owns the
    /// URL's download. Everybody else gets `false` and must drop it.
    pub fn claim(&self, url: &str) -> bool {
        match self.pages.entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(vacant) => {
                vacant.insert(PageState::Queued);
                true
            }
        }
    }

    /// Moves a claimed URL to `next`
    ///
    /// Illegal transitions are logged and ignored.
    pub fn advance(&self, url: &str, next: PageState) -> bool {
        let Some(mut state) = self.pages.get_mut(url) else {
            tracing::warn!("Transition to {} for unclaimed URL {}", next, url);
            return false;
        };

        if !state.can_transition_to(next) {
            tracing::warn!("Invalid state transition for {}: {} -> {}", url, *state, next);
            return false;
        }

        tracing::trace!("{}: {} -> {}", url, *state, next);
        *state = next;
        true
    }

    /// Records a failure for `url` and marks it `Failed`
    ///
    /// Only the first failure recorded for a URL is kept.
    pub fn fail(&self, url: &str, error: PageError) {
        tracing::warn!("Failed {}: {}", url, error);
        self.errors.entry(url.to_string()).or_insert(error);
        self.advance(url, PageState::Failed);
    }

    /// Number of claimed URLs
    pub fn visited(&self) -> usize {
        self.pages.len()
    }

    /// Number of recorded failures
    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    /// Builds the report: downloaded = pages that reached `Done`
    ///
    /// Moves the recorded errors out of the state, so it is meant to be
    /// called once, after the crawl has gone quiescent. A page still in an
    /// active state at that point is logged and left out of both lists.
    pub fn take_report(&self) -> CrawlReport {
        let failed: Vec<String> = self.errors.iter().map(|e| e.key().clone()).collect();
        let errors: HashMap<String, PageError> = failed
            .iter()
            .filter_map(|url| self.errors.remove(url))
            .collect();

        let mut downloaded = Vec::new();
        for page in self.pages.iter() {
            let state = *page.value();
            if !state.is_terminal() {
                tracing::warn!("{} never finished (still {})", page.key(), state);
            } else if state == PageState::Done && !errors.contains_key(page.key()) {
                downloaded.push(page.key().clone());
            }
        }

        CrawlReport { downloaded, errors }
    }
}
