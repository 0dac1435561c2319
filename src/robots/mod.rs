//! Robots.txt handling module
//!
//! The robots.txt of the seed origin is fetched once per run and consulted before
//! every fetch when the crawl is configured to respect it.

mod parser;

pub use parser::ParsedRobots;

use url::Url;

/// Returns the robots.txt location for the origin of `url`
///
/// # Examples
///
/// ```
/// use ripple_sitemap::robots::robots_url;
/// use url::Url;
///
/// let seed = Url::parse("https://example.com:8443/blog/post?x=1").unwrap();
/// assert_eq!(robots_url(&seed).unwrap().as_str(), "https://example.com:8443/robots.txt");
/// ```
pub fn robots_url(url: &Url) -> Option<Url> {
    url.join("/robots.txt").ok()
}

/// Robots policy applied to one crawl run
#[derive(Debug, Clone)]
pub struct RobotsGate {
    robots: ParsedRobots,
    user_agent: String,
}

impl RobotsGate {
    /// Creates a gate for `user_agent` from already-fetched robots data
    pub fn new(robots: ParsedRobots, user_agent: impl Into<String>) -> Self {
        Self {
            robots,
            user_agent: user_agent.into(),
        }
    }

    /// A gate that admits every URL
    pub fn open() -> Self {
        Self::new(ParsedRobots::allow_all(), "*")
    }

    /// Checks if a URL is allowed by robots.txt
    pub fn is_allowed(&self, url: &Url) -> bool {
        self.robots.is_allowed(url, &self.user_agent)
    }
}
