//! Sitemap entry types and output errors
//!
//! This module defines the values streamed into sitemap documents and the errors the
//! writer, rotator and index builder can raise.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to place sitemap at {path}: {source}")]
    Placement {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// How frequently a page is likely to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    /// Returns the protocol keyword for this frequency
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }

    /// Parses a frequency keyword, returning `None` for anything outside the protocol's set
    pub fn parse(value: &str) -> Option<Self> {
        value.parse().ok()
    }
}

impl FromStr for ChangeFrequency {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(Self::Always),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            "yearly" => Ok(Self::Yearly),
            "never" => Ok(Self::Never),
            other => Err(OutputError::InvalidArgument(format!(
                "unknown change frequency '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One `<url>` block of a sitemap
///
/// Entries are write-only: once streamed into a writer they are never read back.
#[derive(Debug, Clone, PartialEq)]
pub struct SitemapEntry {
    /// Absolute page URL, unescaped
    pub location: String,

    /// Last modification date, already formatted as `YYYY-MM-DD`
    pub lastmod: Option<String>,

    /// Expected change frequency
    pub changefreq: Option<ChangeFrequency>,

    /// Relative priority in `0.0..=1.0`
    pub priority: Option<f32>,
}

impl SitemapEntry {
    /// Creates an entry carrying only a location
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            lastmod: None,
            changefreq: None,
            priority: None,
        }
    }

    pub fn with_lastmod(mut self, lastmod: impl Into<String>) -> Self {
        self.lastmod = Some(lastmod.into());
        self
    }

    pub fn with_changefreq(mut self, changefreq: ChangeFrequency) -> Self {
        self.changefreq = Some(changefreq);
        self
    }

    pub fn with_priority(mut self, priority: f32) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// Escapes text for use inside XML element content
pub fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
