//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - The shared crawl frontier and visited set
//! - HTTP fetching behind the `PageFetcher` capability
//! - HTML classification and link extraction
//! - Error classification and run notifications
//! - Overall crawl coordination

mod classify;
mod coordinator;
mod events;
mod fetcher;
mod frontier;
mod parser;

pub use classify::classify;
pub use coordinator::{CrawlOptions, IgnoreFn, RunSummary, SitemapGenerator};
pub use events::{CrawlEvent, ErrorNotice, EventSink, LogSink};
pub use fetcher::{
    build_http_client, FetchErrorKind, FetchFailure, FetchedPage, HttpFetcher, PageFetcher,
};
pub use frontier::{CrawlTask, Frontier};
pub use parser::{parse_page, ParsedPage};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
