//! Sitemap rotator
//!
//! Owns the sequence of sitemap parts for one run. Parts are streamed into temporary
//! files next to the final destination and a new part is opened every
//! `max_entries_per_file` entries.

use crate::output::traits::{OutputError, OutputResult, SitemapEntry};
use crate::output::writer::SitemapWriter;
use crate::url::is_sitemap_url;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A closed sitemap part waiting to be placed at its final location
///
/// The backing temporary file is removed when this value is dropped, so a part that
/// never reaches its destination leaves nothing behind.
#[derive(Debug)]
pub struct SitemapFile {
    file: NamedTempFile,
    ordinal: usize,
    entries: usize,
}

impl SitemapFile {
    /// Path of the temporary backing file
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// 1-based creation order
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Number of entries in this part
    pub fn entries(&self) -> usize {
        self.entries
    }

    pub(crate) fn into_temp_file(self) -> NamedTempFile {
        self.file
    }
}

type PartWriter = SitemapWriter<BufWriter<NamedTempFile>>;

/// Splits a stream of entries across size-bounded sitemap parts
///
/// Not safe for concurrent callers; the crawler serializes access behind one mutex.
#[derive(Debug)]
pub struct SitemapRotator {
    max_entries: usize,
    temp_dir: PathBuf,
    current: Option<PartWriter>,
    finished: Vec<SitemapFile>,
    total_entries: usize,
}

impl SitemapRotator {
    /// Creates a rotator writing temporary parts into `temp_dir`
    ///
    /// # Errors
    ///
    /// Returns `OutputError::InvalidArgument` if `max_entries` is zero.
    pub fn new(max_entries: usize, temp_dir: impl Into<PathBuf>) -> OutputResult<Self> {
        if max_entries < 1 {
            return Err(OutputError::InvalidArgument(
                "max_entries_per_file must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_entries,
            temp_dir: temp_dir.into(),
            current: None,
            finished: Vec::new(),
            total_entries: 0,
        })
    }

    /// Adds one entry, opening or rotating parts as needed
    ///
    /// Entries that point at a sitemap document are skipped and `Ok(false)` is returned.
    pub fn add_entry(&mut self, entry: &SitemapEntry) -> OutputResult<bool> {
        if is_sitemap_url(&entry.location) {
            tracing::debug!("Skipping sitemap URL {}", entry.location);
            return Ok(false);
        }

        let needs_rotation = self
            .current
            .as_ref()
            .map_or(false, |writer| writer.entries() == self.max_entries);
        if needs_rotation {
            self.close_current()?;
        }

        let writer = match self.current.take() {
            Some(writer) => writer,
            None => self.open_part()?,
        };
        self.current.insert(writer).write(entry)?;
        self.total_entries += 1;

        Ok(true)
    }

    /// Closes the open part, if any
    pub fn finish(&mut self) -> OutputResult<()> {
        self.close_current()
    }

    /// Backing file paths of every part, in creation order
    pub fn part_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self
            .finished
            .iter()
            .map(|part| part.path().to_path_buf())
            .collect();
        if let Some(writer) = &self.current {
            paths.push(writer.get_ref().get_ref().path().to_path_buf());
        }
        paths
    }

    /// Takes ownership of all closed parts
    pub fn take_parts(&mut self) -> Vec<SitemapFile> {
        std::mem::take(&mut self.finished)
    }

    /// Total entries written across all parts
    pub fn total_entries(&self) -> usize {
        self.total_entries
    }

    /// Drops every part, open or closed, removing their temporary files
    pub fn discard(&mut self) {
        self.current = None;
        self.finished.clear();
    }

    fn open_part(&self) -> OutputResult<PartWriter> {
        let file = tempfile::Builder::new()
            .prefix(".sitemap_")
            .suffix(".xml.tmp")
            .tempfile_in(&self.temp_dir)?;
        tracing::debug!("Opened sitemap part at {}", file.path().display());
        Ok(SitemapWriter::open(BufWriter::new(file))?)
    }

    fn close_current(&mut self) -> OutputResult<()> {
        if let Some(writer) = self.current.take() {
            let entries = writer.entries();
            let file = writer
                .close()?
                .into_inner()
                .map_err(io::IntoInnerError::into_error)?;
            self.finished.push(SitemapFile {
                file,
                ordinal: self.finished.len() + 1,
                entries,
            });
        }
        Ok(())
    }
}
