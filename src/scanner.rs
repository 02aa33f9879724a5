//! Frame discovery.
//!
//! Frames are the files of one directory with a given extension, in file
//! name order. The scan produces a plain list so muxing stays a function of
//! that list rather than of the filesystem.

use anyhow::{Context, Result};
use bytes::Bytes;
use gobmovie_media::FrameSource;
use std::path::{Path, PathBuf};
use tracing::{info, trace};
use walkdir::WalkDir;

/// List the files in `dir` whose extension matches `extension`
/// (case-insensitive, leading `.` optional), sorted by file name.
pub fn scan_frames(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Frame directory does not exist: {:?}", dir);
    }

    let wanted = extension.trim_start_matches('.');
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.with_context(|| format!("Failed to read directory: {:?}", dir))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let matches = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(wanted));
        if matches {
            paths.push(entry.into_path());
        }
    }

    info!("Found {} *.{} frames in {:?}", paths.len(), wanted, dir);
    Ok(paths)
}

/// Frames read from disk one file at a time.
#[derive(Debug)]
pub struct DirectorySource {
    paths: std::vec::IntoIter<PathBuf>,
    count: usize,
}

impl DirectorySource {
    /// Wrap an ordered list of frame files.
    pub fn new(paths: Vec<PathBuf>) -> Self {
        let count = paths.len();
        Self {
            paths: paths.into_iter(),
            count,
        }
    }
}

impl FrameSource for DirectorySource {
    fn count(&self) -> usize {
        self.count
    }

    fn next_frame(&mut self) -> gobmovie_media::Result<Option<Bytes>> {
        let Some(path) = self.paths.next() else {
            return Ok(None);
        };

        let data = std::fs::read(&path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e))
        })?;
        trace!("Frame {} size:{}", path.display(), data.len());
        Ok(Some(Bytes::from(data)))
    }
}
