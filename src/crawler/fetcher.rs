//! Page-fetch capability
//!
//! This module defines the seam between the crawl pipeline and the network:
//! - `PageFetcher`, the capability the workers call for every task
//! - `FetchedPage` / `FetchFailure`, the two outcomes of one fetch
//! - `HttpFetcher`, the reqwest-backed implementation used by the binary

use crate::config::Config;
use crate::robots::robots_url;
use async_trait::async_trait;
use reqwest::{header, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Last-Modified header value, verbatim
    pub last_modified: Option<String>,

    /// Page body content
    pub body: String,
}

/// Why a fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchErrorKind {
    /// The server answered with a non-success status
    HttpStatus,
    /// The host name could not be resolved
    Dns,
    /// The request did not complete within the timeout
    Timeout,
    /// The connection could not be established
    Connect,
    /// The response was not HTML
    UnsupportedContent,
    /// Anything else (body decoding, redirects, TLS, ...)
    Other,
}

/// A failed fetch
#[derive(Debug, Clone, Error)]
#[error("{kind:?} error for {url}: {message}")]
pub struct FetchFailure {
    /// The URL that was requested
    pub url: String,

    /// HTTP status code, when the server answered
    pub status_code: Option<u16>,

    /// Failure category
    pub kind: FetchErrorKind,

    /// Human readable description
    pub message: String,
}

impl FetchFailure {
    pub fn new(url: &Url, kind: FetchErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.to_string(),
            status_code: None,
            kind,
            message: message.into(),
        }
    }

    /// A non-success HTTP status
    pub fn status(url: &Url, status_code: u16) -> Self {
        Self {
            status_code: Some(status_code),
            ..Self::new(url, FetchErrorKind::HttpStatus, format!("HTTP {}", status_code))
        }
    }

    /// A request that exceeded its timeout
    pub fn timeout(url: &Url) -> Self {
        Self::new(url, FetchErrorKind::Timeout, "Request timeout")
    }
}

/// Capability used by the crawl workers to retrieve pages
///
/// Implementations must enforce their own per-request timeout; the crawler also bounds
/// each call with the configured timeout.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches one page
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchFailure>;

    /// Fetches the robots.txt body for the origin of `url`
    ///
    /// Returning `None` means "no robots.txt", which allows everything.
    async fn fetch_robots(&self, _url: &Url) -> Option<String> {
        None
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `user_agent` - User-Agent header value
/// * `timeout` - Per-request timeout
/// * `accept_invalid_certs` - Skip TLS certificate verification for this client only
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    accept_invalid_certs: bool,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .danger_accept_invalid_certs(accept_invalid_certs)
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed page fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps an already configured client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the crawler and user agent sections of `config`
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent.header_value(),
            Duration::from_millis(config.crawler.timeout),
            config.crawler.ignore_invalid_ssl,
        )?;
        Ok(Self::new(client))
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchFailure> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::status(url, status.as_u16()));
        }

        let headers = response.headers();
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.is_empty()
            && !content_type.contains("text/html")
            && !content_type.contains("application/xhtml+xml")
        {
            return Err(FetchFailure::new(
                url,
                FetchErrorKind::UnsupportedContent,
                format!("Expected HTML, got {}", content_type),
            ));
        }

        let last_modified = headers
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let final_url = response.url().clone();

        let body = response
            .text()
            .await
            .map_err(|e| classify_reqwest_error(url, &e))?;

        Ok(FetchedPage {
            url: final_url,
            status_code: status.as_u16(),
            last_modified,
            body,
        })
    }

    async fn fetch_robots(&self, url: &Url) -> Option<String> {
        let robots = robots_url(url)?;
        match self.client.get(robots.clone()).send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok(),
            Ok(response) => {
                tracing::debug!("{} answered {}", robots, response.status());
                None
            }
            Err(e) => {
                tracing::debug!("Failed to fetch {}: {}", robots, e);
                None
            }
        }
    }
}

/// Maps a reqwest error onto a failure category
fn classify_reqwest_error(url: &Url, error: &reqwest::Error) -> FetchFailure {
    let kind = if error.is_timeout() {
        FetchErrorKind::Timeout
    } else if is_dns_error(error) {
        FetchErrorKind::Dns
    } else if error.is_connect() {
        FetchErrorKind::Connect
    } else {
        FetchErrorKind::Other
    };

    FetchFailure {
        status_code: error.status().map(|s| s.as_u16()),
        ..FetchFailure::new(url, kind, error.to_string())
    }
}

/// Walks the error chain looking for a resolver failure
fn is_dns_error(error: &reqwest::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(error);
    while let Some(err) = source {
        let message = err.to_string().to_ascii_lowercase();
        if message.contains("dns error")
            || message.contains("failed to lookup address")
            || message.contains("name or service not known")
        {
            return true;
        }
        source = err.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client() {
        let client = build_http_client("TestCrawler/1.0", Duration::from_secs(5), false);
        assert!(client.is_ok());
    }

    #[test]
    fn test_build_client_accepting_invalid_certs() {
        let client = build_http_client("TestCrawler/1.0", Duration::from_secs(5), true);
        assert!(client.is_ok());
    }

    #[test]
    fn test_from_config() {
        let config = Config::with_seed("https://example.com/");
        assert!(HttpFetcher::from_config(&config).is_ok());
    }

    #[test]
    fn test_status_failure() {
        let url = Url::parse("https://example.com/missing").unwrap();
        let failure = FetchFailure::status(&url, 404);
        assert_eq!(failure.status_code, Some(404));
        assert_eq!(failure.kind, FetchErrorKind::HttpStatus);
        assert_eq!(failure.url, "https://example.com/missing");
    }

    #[test]
    fn test_timeout_failure() {
        let url = Url::parse("https://example.com/slow").unwrap();
        let failure = FetchFailure::timeout(&url);
        assert_eq!(failure.status_code, None);
        assert_eq!(failure.kind, FetchErrorKind::Timeout);
    }
}
