//! Page state definitions for tracking crawl progress
//!
//! A URL that has never been claimed has no state at all; claiming it puts it
//! in `Queued`.
use std::fmt;

/// Represents the current state of a URL within one crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageState {
    // ===== Active States =====
    /// Claimed and waiting for a host slot
    Queued,

    /// Admitted by the host gate and being fetched
    Downloading,

    /// Fetched; the host slot has been released
    Downloaded,

    /// Links are being extracted on the extraction pool
    Extracting,

    // ===== Terminal States =====
    /// Fully processed
    Done,

    /// Recorded in the error map
    Failed,
}

impl PageState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Checks whether moving from `self` to `next` is a legal transition
    pub fn can_transition_to(&self, next: PageState) -> bool {
        use PageState::*;

        matches!(
            (self, next),
            (Queued, Downloading)
                | (Queued, Failed)
                | (Downloading, Downloaded)
                | (Downloading, Failed)
                | (Downloaded, Extracting)
                | (Downloaded, Done)
                | (Downloaded, Failed)
                | (Extracting, Done)
                | (Extracting, Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Downloading => "downloading",
            Self::Downloaded => "downloaded",
            Self::Extracting => "extracting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
