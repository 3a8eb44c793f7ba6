//! On-disk naming of rotated segments and archives.
//!
//! Given a base path `P` the layout is:
//!
//! ```text
//! <dir>/
//! ├─ P          # active file
//! ├─ P.7        # retired segment awaiting compression
//! └─ P.6.gz     # archive of segment 6
//! ```
//!
//! Indices are recovered from the directory listing at every rotation, so
//! the next index is always one past the highest index present on disk.
//! This only holds while a single writer rotates a given base path.

use crate::error::{RotateError, RotateResult};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Derives segment and archive names from a base path.
#[derive(Debug, Clone)]
pub struct SegmentNaming {
    base: PathBuf,
    dir: PathBuf,
    file_name: String,
    extension: String,
}

impl SegmentNaming {
    /// Creates naming rules for `base` with archives ending in `.<extension>`.
    ///
    /// A base path without a directory component is resolved against `.`.
    #[must_use]
    pub fn new(base: &Path, extension: &str) -> Self {
        let dir = match base.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let file_name = base
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            base: base.to_path_buf(),
            dir,
            file_name,
            extension: extension.to_string(),
        }
    }

    /// Returns the base (active file) path.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Returns the directory scanned for segments.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the path of segment `index`.
    #[must_use]
    pub fn segment_path(&self, index: u64) -> PathBuf {
        append_suffix(&self.base, &index.to_string())
    }

    /// Returns the archive path for a segment path.
    #[must_use]
    pub fn archive_path_for(&self, segment: &Path) -> PathBuf {
        append_suffix(segment, &self.extension)
    }

    /// Returns the archive path of segment `index`.
    #[must_use]
    pub fn archive_path(&self, index: u64) -> PathBuf {
        self.archive_path_for(&self.segment_path(index))
    }

    /// Parses the index out of a directory entry name.
    ///
    /// Accepts `<base>.<n>` and `<base>.<n>.<ext>`; everything else,
    /// including malformed or overflowing numbers, yields `None`.
    #[must_use]
    pub fn parse_index(&self, name: &str) -> Option<u64> {
        let rest = name.strip_prefix(self.file_name.as_str())?.strip_prefix('.')?;
        let digits = match rest.strip_suffix(self.extension.as_str()) {
            Some(stem) => stem.strip_suffix('.').unwrap_or(rest),
            None => rest,
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }

    /// Lists the directory and returns the highest index in use, or 0.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError::Scan`] if the directory cannot be listed.
    pub fn scan_max_index(&self) -> RotateResult<u64> {
        let scan_err = |source| RotateError::Scan {
            dir: self.dir.clone(),
            source,
        };

        let mut max_index = 0;
        let mut matched = 0usize;
        for entry in fs::read_dir(&self.dir).map_err(scan_err)? {
            let entry = entry.map_err(scan_err)?;
            let Some(index) = entry.file_name().to_str().and_then(|n| self.parse_index(n))
            else {
                continue;
            };
            matched += 1;
            max_index = max_index.max(index);
        }

        debug!(dir = ?self.dir, matched, max_index, "scanned rotated segments");
        Ok(max_index)
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
