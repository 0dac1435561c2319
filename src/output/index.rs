//! Sitemap index builder

use crate::output::traits::{escape_xml, OutputError, OutputResult};
use crate::output::extend_filename;

/// XML prolog of a sitemap index
pub const INDEX_PROLOG: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Builds the sitemap index document referencing `part_count` parts
///
/// Part `i` (1-based) is named by inserting `_part<i>` before the extension of
/// `final_filename` and is located at `<base_url>/<part filename>`.
///
/// # Errors
///
/// Returns `OutputError::InvalidArgument` if `part_count` is zero.
///
/// # Example
///
/// ```
/// use ripple_sitemap::output::build_index;
///
/// let xml = build_index("https://example.com", "sitemap.xml", 2).unwrap();
/// assert!(xml.contains("<loc>https://example.com/sitemap_part2.xml</loc>"));
/// ```
pub fn build_index(base_url: &str, final_filename: &str, part_count: usize) -> OutputResult<String> {
    if part_count < 1 {
        return Err(OutputError::InvalidArgument(
            "part_count must be at least 1".to_string(),
        ));
    }

    let base = base_url.trim_end_matches('/');
    let mut lines = vec![
        INDEX_PROLOG.to_string(),
        r#"<sitemapindex xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#.to_string(),
    ];

    for i in 1..=part_count {
        let part_filename = extend_filename(final_filename, &format!("_part{}", i));
        lines.push("  <sitemap>".to_string());
        lines.push(format!(
            "    <loc>{}</loc>",
            escape_xml(&format!("{}/{}", base, part_filename))
        ));
        lines.push("  </sitemap>".to_string());
    }

    lines.push("</sitemapindex>".to_string());
    Ok(lines.join("\n"))
}
