//! Streaming sitemap writer
//!
//! Emits one `<urlset>` document into any `Write` sink, one entry at a time.

use crate::output::traits::{escape_xml, SitemapEntry};
use std::io::{self, Write};

/// XML prolog of a sitemap part
pub const SITEMAP_PROLOG: &str = r#"<?xml version="1.0" encoding="utf-8" standalone="yes" ?>"#;

/// Opening tag of a sitemap part
pub const URLSET_OPEN: &str = r#"<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">"#;

/// Writes a single sitemap document
///
/// The document is opened on construction and finalized by [`SitemapWriter::close`],
/// which hands the underlying sink back to the caller.
#[derive(Debug)]
pub struct SitemapWriter<W: Write> {
    sink: W,
    entries: usize,
}

impl<W: Write> SitemapWriter<W> {
    /// Writes the prolog and the `<urlset>` opening tag
    pub fn open(mut sink: W) -> io::Result<Self> {
        sink.write_all(SITEMAP_PROLOG.as_bytes())?;
        sink.write_all(b"\n")?;
        sink.write_all(URLSET_OPEN.as_bytes())?;
        Ok(Self { sink, entries: 0 })
    }

    /// Writes one `<url>` block
    pub fn write(&mut self, entry: &SitemapEntry) -> io::Result<()> {
        let mut block = String::with_capacity(64 + entry.location.len());
        block.push_str("\n  <url>\n");
        block.push_str(&format!("    <loc>{}</loc>\n", escape_xml(&entry.location)));
        if let Some(lastmod) = &entry.lastmod {
            block.push_str(&format!("    <lastmod>{}</lastmod>\n", escape_xml(lastmod)));
        }
        if let Some(changefreq) = entry.changefreq {
            block.push_str(&format!("    <changefreq>{}</changefreq>\n", changefreq));
        }
        if let Some(priority) = entry.priority {
            block.push_str(&format!("    <priority>{:.1}</priority>\n", priority));
        }
        block.push_str("  </url>");

        self.sink.write_all(block.as_bytes())?;
        self.entries += 1;
        Ok(())
    }

    /// Returns a reference to the underlying sink
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Number of entries written so far
    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Writes the closing tag, flushes and returns the sink
    pub fn close(mut self) -> io::Result<W> {
        self.sink.write_all(b"\n</urlset>")?;
        self.sink.flush()?;
        Ok(self.sink)
    }
}
