use crate::UrlError;
use url::Url;

/// List of tracking query parameters to remove during normalization
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_term",
    "utm_content",
    "fbclid",
    "gclid",
    "mc_eid",
];

/// Resolves a raw href against `base` and canonicalizes the result
///
/// # Normalization Steps
///
/// 1. Resolve relative to `base`; reject if the result is not a well-formed URL
/// 2. Reject anything that is not HTTP(S) or has no host
/// 3. Remove fragment (everything after #)
/// 4. Remove tracking query parameters
/// 5. Sort remaining query parameters by key
/// 6. Remove empty query string (trailing ?)
///
/// Host lowercasing and dot-segment removal are performed by the parser itself.
///
/// # Arguments
///
/// * `raw` - The href or URL string to normalize
/// * `base` - The URL of the page the href was found on
///
/// # Returns
///
/// * `Ok(Url)` - Normalized absolute URL
/// * `Err(UrlError)` - The href could not be turned into a crawlable URL
///
/// # Examples
///
/// ```
/// use ripple_sitemap::url::normalize;
/// use url::Url;
///
/// let base = Url::parse("https://EXAMPLE.com/blog/").unwrap();
/// let url = normalize("post?b=2&a=1#top", &base).unwrap();
/// assert_eq!(url.as_str(), "https://example.com/blog/post?a=1&b=2");
/// ```
pub fn normalize(raw: &str, base: &Url) -> Result<Url, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let mut url = base
        .join(raw)
        .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query().is_some() {
        normalize_query(&mut url);
    }

    Ok(url)
}

/// Parses a standalone absolute URL, such as a seed
pub fn normalize_absolute(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    normalize(url.as_str(), &url)
}

/// Drops the whole query string
pub fn strip_query(url: &mut Url) {
    url.set_query(None);
}

/// Filters tracking parameters and sorts the rest by key
///
/// Pairs are kept in their published encoding (`%20` stays `%20`, a bare `flag`
/// stays `flag`), so equivalent queries always produce the same string.
fn normalize_query(url: &mut Url) {
    let Some(query) = url.query().map(str::to_string) else {
        return;
    };

    let mut params: Vec<&str> = query
        .split('&')
        .filter(|pair| !pair.is_empty() && !is_tracking_param(pair_key(pair)))
        .collect();
    params.sort_by(|a, b| pair_key(a).cmp(pair_key(b)));

    let rebuilt = params.join("&");
    if rebuilt.is_empty() {
        url.set_query(None);
    } else if rebuilt != query {
        url.set_query(Some(&rebuilt));
    }
}

/// Raw key of an encoded `key=value` pair
fn pair_key(pair: &str) -> &str {
    pair.split_once('=').map_or(pair, |(key, _)| key)
}

/// Checks if a query parameter is a tracking parameter
fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/index.html").unwrap()
    }

    #[test]
    fn test_resolve_relative_path() {
        let result = normalize("post", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/blog/post");
    }

    #[test]
    fn test_resolve_root_relative() {
        let result = normalize("/about", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_absolute_href_ignores_base() {
        let result = normalize("https://other.com/x", &base()).unwrap();
        assert_eq!(result.as_str(), "https://other.com/x");
    }

    #[test]
    fn test_remove_fragment() {
        let result = normalize("/page#section", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_fragment_only_resolves_to_page() {
        let result = normalize("#top", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/blog/index.html");
    }

    #[test]
    fn test_lowercase_host() {
        let result = normalize("https://EXAMPLE.COM/Page", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/Page");
    }

    #[test]
    fn test_dot_segments() {
        let result = normalize("../a/./b", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/a/b");
    }

    #[test]
    fn test_remove_tracking_params() {
        let result = normalize("/page?utm_source=twitter&fbclid=1", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page");
    }

    #[test]
    fn test_sort_query_params() {
        let result = normalize("/page?b=2&a=1", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/page?a=1&b=2");
    }

    #[test]
    fn test_sorting_keeps_pair_encoding() {
        let reordered = normalize("/s?b=x%20y&a=1", &base()).unwrap();
        let ordered = normalize("/s?a=1&b=x%20y", &base()).unwrap();
        assert_eq!(reordered.as_str(), "https://example.com/s?a=1&b=x%20y");
        assert_eq!(reordered, ordered);
    }

    #[test]
    fn test_sorting_keeps_bare_keys() {
        let result = normalize("/s?flag&a=1&utm_medium=mail", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/s?a=1&flag");
    }

    #[test]
    fn test_equal_keys_keep_relative_order() {
        let result = normalize("/s?tag=b&a=1&tag=a", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/s?a=1&tag=b&tag=a");
    }

    #[test]
    fn test_sorted_query_left_untouched() {
        let result = normalize("/search?q=a%20b", &base()).unwrap();
        assert_eq!(result.as_str(), "https://example.com/search?q=a%20b");
    }

    #[test]
    fn test_reject_mailto() {
        let result = normalize("mailto:someone@example.com", &base());
        assert!(matches!(result.unwrap_err(), UrlError::InvalidScheme(_)));
    }

    #[test]
    fn test_reject_javascript() {
        assert!(normalize("javascript:void(0)", &base()).is_err());
    }

    #[test]
    fn test_reject_empty() {
        assert!(matches!(
            normalize("   ", &base()).unwrap_err(),
            UrlError::Parse(_)
        ));
    }

    #[test]
    fn test_reject_malformed_absolute() {
        assert!(normalize("http://", &base()).is_err());
    }

    #[test]
    fn test_normalize_absolute_seed() {
        let result = normalize_absolute("https://Example.com").unwrap();
        assert_eq!(result.as_str(), "https://example.com/");
    }

    #[test]
    fn test_normalize_absolute_rejects_relative() {
        assert!(normalize_absolute("/just/a/path").is_err());
    }

    #[test]
    fn test_strip_query() {
        let mut url = normalize("/page?a=1", &base()).unwrap();
        strip_query(&mut url);
        assert_eq!(url.as_str(), "https://example.com/page");
    }
}
