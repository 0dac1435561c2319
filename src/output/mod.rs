//! Output module for writing sitemap documents
//!
//! This module handles:
//! - Streaming entries into sitemap XML documents
//! - Rotating parts by entry count
//! - Building the sitemap index
//! - Placing finished parts at their final paths

mod index;
mod rotator;
mod traits;
mod writer;

pub use index::{build_index, INDEX_PROLOG};
pub use rotator::{SitemapFile, SitemapRotator};
pub use traits::{escape_xml, ChangeFrequency, OutputError, OutputResult, SitemapEntry};
pub use writer::{SitemapWriter, SITEMAP_PROLOG, URLSET_OPEN};

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Inserts `suffix` before a filename's extension, or appends it when there is none
///
/// Leading dots (hidden files) do not count as an extension separator.
///
/// # Examples
///
/// ```
/// use ripple_sitemap::output::extend_filename;
///
/// assert_eq!(extend_filename("sitemap.xml", "_part1"), "sitemap_part1.xml");
/// assert_eq!(extend_filename("sitemap", "_part1"), "sitemap_part1");
/// ```
pub fn extend_filename(filename: &str, suffix: &str) -> String {
    match filename.rfind('.') {
        Some(dot) if dot > 0 && dot + 1 < filename.len() => {
            format!("{}{}{}", &filename[..dot], suffix, &filename[dot..])
        }
        _ => format!("{}{}", filename, suffix),
    }
}

/// Applies [`extend_filename`] to the file name component of `path`
pub fn extend_path(path: &Path, suffix: &str) -> PathBuf {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(extend_filename(&filename, suffix))
}

/// Places finished sitemap parts at their final locations
///
/// | Parts | Result |
/// |-------|--------|
/// | 0 | an empty `<urlset>` document at `final_path` |
/// | 1 | the part at `final_path` |
/// | n > 1 | part `i` at `final_path` with `_part<i>`, plus the index at `final_path` |
///
/// If any step fails, files already placed by this call are removed again so the
/// destination never holds a partial result.
///
/// # Arguments
///
/// * `parts` - Closed parts in creation order
/// * `final_path` - Configured output path
/// * `base_url` - URL prefix used for `<loc>` entries of the index
///
/// # Returns
///
/// The paths written, in order (parts first, index last).
pub fn place_sitemaps(
    parts: Vec<SitemapFile>,
    final_path: &Path,
    base_url: &str,
) -> OutputResult<Vec<PathBuf>> {
    let mut placed = Vec::new();
    let result = place_all(parts, final_path, base_url, &mut placed);

    if let Err(e) = &result {
        tracing::error!("Failed to place sitemaps: {}", e);
        for path in &placed {
            if let Err(remove_err) = std::fs::remove_file(path) {
                tracing::warn!("Failed to remove {}: {}", path.display(), remove_err);
            }
        }
    }

    result.map(|()| placed)
}

fn place_all(
    parts: Vec<SitemapFile>,
    final_path: &Path,
    base_url: &str,
    placed: &mut Vec<PathBuf>,
) -> OutputResult<()> {
    match parts.len() {
        0 => {
            let file = File::create(final_path).map_err(|e| placement_error(final_path, e))?;
            placed.push(final_path.to_path_buf());
            SitemapWriter::open(BufWriter::new(file))
                .and_then(SitemapWriter::close)
                .map_err(|e| placement_error(final_path, e))?;
        }
        1 => {
            for part in parts {
                persist_part(part.into_temp_file(), final_path)?;
                placed.push(final_path.to_path_buf());
            }
        }
        count => {
            for part in parts {
                let destination = extend_path(final_path, &format!("_part{}", part.ordinal()));
                persist_part(part.into_temp_file(), &destination)?;
                placed.push(destination);
            }

            let filename = final_path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let index = build_index(base_url, &filename, count)?;
            std::fs::write(final_path, index).map_err(|e| placement_error(final_path, e))?;
            placed.push(final_path.to_path_buf());
        }
    }

    Ok(())
}

/// Moves a temporary part into place, copying when a rename is not possible
fn persist_part(file: NamedTempFile, destination: &Path) -> OutputResult<()> {
    match file.persist(destination) {
        Ok(_) => {}
        Err(persist_err) => {
            tracing::debug!(
                "Rename to {} failed ({}), copying instead",
                destination.display(),
                persist_err.error
            );
            let file = persist_err.file;
            std::fs::copy(file.path(), destination).map_err(|e| placement_error(destination, e))?;
        }
    }
    tracing::info!("Wrote sitemap {}", destination.display());
    Ok(())
}

fn placement_error(path: &Path, source: std::io::Error) -> OutputError {
    OutputError::Placement {
        path: path.display().to_string(),
        source,
    }
}
