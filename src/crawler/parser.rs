//! HTML parser for crawl classification and link extraction
//!
//! This module handles parsing HTML content to extract:
//! - Outbound anchors (raw `href` values, resolved later against the page URL)
//! - The robots `noindex` directive
//! - The AMP marker on the `<html>` element

use scraper::{Html, Selector};

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Raw `href` attributes of every anchor, in document order
    pub links: Vec<String>,

    /// A `<meta name="robots">` tag asks for the page not to be indexed
    pub noindex: bool,

    /// The `<html>` element carries the AMP marker
    pub amp: bool,
}

/// Parses HTML content and classifies the page
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `detect_amp` - Whether to look for the AMP marker at all
///
/// # Example
///
/// ```
/// use ripple_sitemap::crawler::parse_page;
///
/// let html = r#"<html><head><meta name="robots" content="NOINDEX"></head>
///     <body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_page(html, true);
/// assert!(parsed.noindex);
/// assert_eq!(parsed.links, vec!["/page".to_string()]);
/// ```
pub fn parse_page(html: &str, detect_amp: bool) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        links: extract_hrefs(&document),
        noindex: has_noindex(&document),
        amp: detect_amp && is_amp(&document),
    }
}

/// Collects every non-empty anchor href
fn extract_hrefs(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    if let Ok(a_selector) = Selector::parse("a[href]") {
        for element in document.select(&a_selector) {
            if let Some(href) = element.value().attr("href") {
                let href = href.trim();
                if !href.is_empty() {
                    links.push(href.to_string());
                }
            }
        }
    }

    links
}

/// Checks for `<meta name="robots">` with a content containing "noindex"
fn has_noindex(document: &Html) -> bool {
    let Ok(meta_selector) = Selector::parse("meta[name]") else {
        return false;
    };

    document
        .select(&meta_selector)
        .filter(|element| {
            element
                .value()
                .attr("name")
                .map_or(false, |name| name.trim().eq_ignore_ascii_case("robots"))
        })
        .filter_map(|element| element.value().attr("content"))
        .any(|content| content.to_ascii_lowercase().contains("noindex"))
}

/// Checks the root `<html>` element for an `amp` or `⚡` attribute
fn is_amp(document: &Html) -> bool {
    document
        .root_element()
        .value()
        .attrs()
        .any(|(name, _)| name.eq_ignore_ascii_case("amp") || name.starts_with('⚡'))
}
