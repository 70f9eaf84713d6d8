//! State module for tracking crawl progress
//!
//! This module provides the state shared by the workers of one crawl.
//!
//! # Components
//!
//! - `PageState`: per-URL state machine (queued, downloading, extracting, ...)
//! - `CrawlState`: the visited set and error map of a crawl

mod crawl_state;
mod page_state;

// Re-export main types
pub use crawl_state::{CrawlReport, CrawlState};
pub use page_state::PageState;
