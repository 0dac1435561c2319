use serde::Deserialize;

/// Main configuration structure for Ripple-Sitemap
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// URL the crawl starts from; also anchors the crawl scope
    pub seed: String,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Creates a configuration with defaults for everything but the seed
    pub fn with_seed(seed: impl Into<String>) -> Self {
        Self {
            seed: seed.into(),
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum depth of newly enqueued pages (0 means unlimited)
    #[serde(rename = "max-depth", default)]
    pub max_depth: u32,

    /// Number of concurrent fetch workers
    #[serde(default = "default_concurrency")]
    pub concurrency: u32,

    /// Per-request timeout (milliseconds)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Whether to honor the seed origin's robots.txt
    #[serde(rename = "respect-robots-txt", default = "default_true")]
    pub respect_robots_txt: bool,

    /// Accept invalid TLS certificates for this run's requests
    #[serde(rename = "ignore-invalid-ssl", default)]
    pub ignore_invalid_ssl: bool,

    /// Keep AMP pages out of the sitemap
    #[serde(rename = "ignore-amp", default = "default_true")]
    pub ignore_amp: bool,

    /// Remove query strings from discovered URLs
    #[serde(rename = "strip-querystring", default = "default_true")]
    pub strip_querystring: bool,

    /// URLs containing any of these substrings are crawled but not added
    #[serde(rename = "ignore-patterns", default)]
    pub ignore_patterns: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            concurrency: default_concurrency(),
            timeout: default_timeout(),
            respect_robots_txt: true,
            ignore_invalid_ssl: false,
            ignore_amp: true,
            strip_querystring: true,
            ignore_patterns: Vec::new(),
        }
    }
}

/// User agent identification configuration
#[derive(Debug, Clone, Deserialize)]
pub struct UserAgentConfig {
    /// Name of the crawler, also used as the robots.txt product token
    #[serde(rename = "crawler-name", default = "default_crawler_name")]
    pub crawler_name: String,

    /// Version of the crawler
    #[serde(rename = "crawler-version", default = "default_crawler_version")]
    pub crawler_version: String,

    /// URL with information about the crawler
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,
}

impl UserAgentConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `CrawlerName/Version` or `CrawlerName/Version (+ContactURL)`
    pub fn header_value(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.crawler_name, self.crawler_version, contact
            ),
            None => format!("{}/{}", self.crawler_name, self.crawler_version),
        }
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: default_crawler_name(),
            crawler_version: default_crawler_version(),
            contact_url: None,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Final sitemap path; parts and the index are derived from it
    #[serde(default = "default_filepath")]
    pub filepath: String,

    /// Maximum entries per sitemap part
    #[serde(rename = "max-entries-per-file", default = "default_max_entries")]
    pub max_entries_per_file: usize,

    /// URL prefix for part locations in the index (defaults to the seed)
    #[serde(rename = "base-url", default)]
    pub base_url: Option<String>,

    /// Write `<lastmod>` from the Last-Modified response header
    #[serde(rename = "include-lastmod", default)]
    pub include_lastmod: bool,

    /// `<changefreq>` written for every entry
    #[serde(default)]
    pub changefreq: Option<String>,

    /// `<priority>` written for every entry
    #[serde(default)]
    pub priority: Option<f32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filepath: default_filepath(),
            max_entries_per_file: default_max_entries(),
            base_url: None,
            include_lastmod: false,
            changefreq: None,
            priority: None,
        }
    }
}

fn default_concurrency() -> u32 {
    10
}

fn default_timeout() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

fn default_crawler_name() -> String {
    "RippleSitemap".to_string()
}

fn default_crawler_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_filepath() -> String {
    "./sitemap.xml".to_string()
}

fn default_max_entries() -> usize {
    50_000
}
