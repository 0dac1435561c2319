use url::Url;

/// File extensions that never point at crawlable HTML
pub const EXCLUDED_EXTENSIONS: &[&str] = &[
    "gif", "jpg", "jpeg", "png", "ico", "bmp", "ogg", "webp", "mp4", "webm", "mp3", "ttf",
    "woff", "json", "rss", "atom", "gz", "zip", "rar", "7z", "css", "js", "gzip", "exe", "svg",
];

/// Crawl scope anchored at a seed URL
///
/// A URL is in scope when it shares the seed's host, lives under the seed's path
/// (unless the seed path is `/`) and does not end in an excluded extension.
/// Sitemap documents are never in scope.
#[derive(Debug, Clone)]
pub struct Scope {
    seed: Url,
}

impl Scope {
    /// Creates a scope anchored at `seed`
    pub fn new(seed: Url) -> Self {
        Self { seed }
    }

    /// Returns the seed URL this scope is anchored at
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Checks whether `url` should be crawled
    pub fn contains(&self, url: &Url) -> bool {
        in_scope(url, &self.seed)
    }
}

/// Decides whether a candidate URL is in scope for a crawl seeded at `seed`
///
/// # Examples
///
/// ```
/// use ripple_sitemap::url::in_scope;
/// use url::Url;
///
/// let seed = Url::parse("https://example.com/blog").unwrap();
/// assert!(in_scope(&Url::parse("https://example.com/blog/a").unwrap(), &seed));
/// assert!(!in_scope(&Url::parse("https://other.com/blog/a").unwrap(), &seed));
/// assert!(!in_scope(&Url::parse("https://example.com/blog/logo.PNG").unwrap(), &seed));
/// ```
pub fn in_scope(url: &Url, seed: &Url) -> bool {
    if is_sitemap_url(url.path()) {
        return false;
    }

    if url.host_str() != seed.host_str() {
        return false;
    }

    if seed.path() != "/" && !url.path().starts_with(seed.path()) {
        return false;
    }

    !has_excluded_extension(url.path())
}

/// Checks whether a path refers to a sitemap document
pub fn is_sitemap_url(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with("sitemap.xml")
}

/// Checks the final path segment's extension against the excluded set
fn has_excluded_extension(path: &str) -> bool {
    let last_segment = path.rsplit('/').next().unwrap_or("");
    match last_segment.rsplit_once('.') {
        Some((_, ext)) => EXCLUDED_EXTENSIONS
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(ext)),
        None => false,
    }
}
