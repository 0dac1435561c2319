//! Crawl notifications
//!
//! Every externally visible outcome of a run is delivered as a `CrawlEvent` to the
//! run's `EventSink`.

use reqwest::StatusCode;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Payload of an error notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNotice {
    /// Classified status code
    pub code: u16,

    /// Reason phrase for `code`
    pub message: String,

    /// The URL that failed; `None` for run-level failures
    pub url: Option<String>,
}

impl ErrorNotice {
    /// Creates a notice whose message is the standard reason phrase for `code`
    pub fn from_code(code: u16, url: Option<String>) -> Self {
        let message = StatusCode::from_u16(code)
            .ok()
            .and_then(|status| status.canonical_reason())
            .unwrap_or("Unknown error")
            .to_string();
        Self { code, message, url }
    }

    /// Creates a run-level notice carrying an explicit message
    pub fn run_failure(message: impl Into<String>) -> Self {
        Self {
            code: 500,
            message: message.into(),
            url: None,
        }
    }
}

/// A notification emitted during a run
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    /// The page was added to the sitemap
    Add { url: String },

    /// The page was fetched but kept out of the sitemap
    Ignore { url: String },

    /// A fetch failed, or the run itself failed
    Error(ErrorNotice),

    /// The run finished and its output is in place
    Done {
        entries: usize,
        paths: Vec<PathBuf>,
    },
}

/// Receiver of crawl notifications
///
/// Implementations are called from worker tasks and must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: CrawlEvent);
}

impl EventSink for mpsc::UnboundedSender<CrawlEvent> {
    fn emit(&self, event: CrawlEvent) {
        // A dropped receiver just means nobody is listening any more
        let _ = self.send(event);
    }
}

/// Sink that reports every event through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: CrawlEvent) {
        match event {
            CrawlEvent::Add { url } => tracing::info!("Added {}", url),
            CrawlEvent::Ignore { url } => tracing::info!("Ignored {}", url),
            CrawlEvent::Error(notice) => tracing::warn!(
                "Error {} ({}) for {}",
                notice.code,
                notice.message,
                notice.url.as_deref().unwrap_or("crawl run")
            ),
            CrawlEvent::Done { entries, paths } => {
                tracing::info!("Done: {} entries in {} file(s)", entries, paths.len())
            }
        }
    }
}
