//! Source format adapters and input discovery.
//!
//! Each supported export format implements [`TrackSource`]: given the raw
//! bytes of one file it returns a [`SourceTrack`] with samples in file order.
//! The format is chosen from the file extension via [`SourceFormat`], never by
//! sniffing content.
//!
//! | Format | Adapter | Embedded activity code |
//! |--------|---------|------------------------|
//! | GPX 1.1 | [`GpxSource`] | `<trk><type>` when numeric |
//! | TCX | [`TcxSource`] | none |

use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::{Result, SourceTrack, TrackError};

mod gpx_file;
mod tcx_file;

pub use gpx_file::GpxSource;
pub use tcx_file::TcxSource;

/// Capability shared by all format adapters.
pub trait TrackSource: Send + Sync {
    /// Format handled by this adapter.
    fn format(&self) -> SourceFormat;

    /// Parse one file's content into an ordered sample sequence.
    ///
    /// `source_id` is the display name the samples will be attributed to.
    fn read_track(&self, source_id: &str, input: &[u8]) -> Result<SourceTrack>;
}

/// Supported export formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    Gpx,
    Tcx,
}

impl SourceFormat {
    /// Select a format from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| Self::from_hint(ext).ok())
    }

    /// Select a format from an extension or format name such as `"gpx"` or
    /// `"ride.tcx"`.
    pub fn from_hint(hint: &str) -> Result<Self> {
        let hint_lc = hint.to_ascii_lowercase();
        [SourceFormat::Gpx, SourceFormat::Tcx]
            .into_iter()
            .find(|format| {
                let ext = format.extension();
                hint_lc == ext
                    || hint_lc
                        .strip_suffix(ext)
                        .is_some_and(|stem| stem.ends_with('.'))
            })
            .ok_or_else(|| TrackError::UnsupportedFormat(hint.to_string()))
    }

    /// File extension for this format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            SourceFormat::Gpx => "gpx",
            SourceFormat::Tcx => "tcx",
        }
    }

    /// The adapter that reads this format.
    pub fn adapter(&self) -> &'static dyn TrackSource {
        match self {
            SourceFormat::Gpx => &GpxSource,
            SourceFormat::Tcx => &TcxSource,
        }
    }
}

/// A file selected for ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// File name, used as the source identifier
    pub source_id: String,
    pub format: SourceFormat,
}

impl DiscoveredFile {
    /// Read the file and run it through its format adapter.
    pub fn read(&self) -> Result<SourceTrack> {
        let bytes = std::fs::read(&self.path).map_err(|e| TrackError::io(&self.path, e))?;
        self.format.adapter().read_track(&self.source_id, &bytes)
    }
}

/// List the GPX/TCX files directly inside `dir`, sorted by file name.
///
/// The sort fixes the enumeration order, which in turn fixes activity
/// numbering. Subdirectories and files with other extensions are skipped.
pub fn discover_sources(dir: &Path) -> Result<Vec<DiscoveredFile>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| TrackError::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        match SourceFormat::from_path(path) {
            Some(format) => files.push(DiscoveredFile {
                path: path.to_path_buf(),
                source_id: entry.file_name().to_string_lossy().into_owned(),
                format,
            }),
            None => debug!("[Sources] Ignoring {}", path.display()),
        }
    }

    debug!(
        "[Sources] Discovered {} track files in {}",
        files.len(),
        dir.display()
    );
    Ok(files)
}
