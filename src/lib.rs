//! Ripple-Sitemap: a single-domain sitemap generator
//!
//! This crate discovers every reachable page under a seed URL with a bounded pool of
//! concurrent workers and streams the accepted pages into size-bounded sitemap XML
//! documents, assembling a sitemap index when more than one part is produced.

pub mod config;
pub mod crawler;
pub mod output;
pub mod robots;
pub mod url;

use thiserror::Error;

/// Main error type for Ripple-Sitemap operations
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("A crawl run is already active")]
    AlreadyRunning,

    #[error("Crawl worker failed: {0}")]
    Worker(String),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("Sitemap output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

/// Result type alias for Ripple-Sitemap operations
pub type Result<T> = std::result::Result<T, SitemapError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlEvent, CrawlOptions, HttpFetcher, PageFetcher, RunSummary, SitemapGenerator};
pub use output::{build_index, SitemapEntry};
pub use crate::url::{in_scope, normalize, Scope};
