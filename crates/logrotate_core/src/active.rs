//! The active log file.

use crate::error::{RotateError, RotateResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// The file currently receiving log lines.
///
/// Tracks the number of bytes written since the handle was opened, seeded
/// from the existing length when an existing file is reopened. The handle is
/// owned exclusively by the engine's foreground loop, so no locking is done
/// around the size counter.
///
/// # Durability
///
/// Writes go straight to the OS without user-space buffering. `close` can
/// additionally call `File::sync_all()`.
#[derive(Debug)]
pub struct ActiveFile {
    path: PathBuf,
    file: File,
    size: u64,
}

impl ActiveFile {
    /// Opens or creates `path` in append mode.
    ///
    /// The size counter starts at the file's current length so a restarted
    /// process keeps its place toward the rotation threshold.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or stat'ed, or if
    /// `lock` is set and another writer holds the lock.
    pub fn open_append(path: &Path, lock: bool) -> RotateResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|e| RotateError::open(path, e))?;

        let size = file.metadata().map_err(|e| RotateError::open(path, e))?.len();
        Self::finish_open(path, file, size, lock)
    }

    /// Creates `path` empty, truncating anything already there.
    ///
    /// The lock is taken before truncating, so a file held by another
    /// writer is left untouched.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or truncated, or if
    /// `lock` is set and another writer holds the lock.
    pub fn create(path: &Path, lock: bool) -> RotateResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)
            .map_err(|e| RotateError::open(path, e))?;

        let active = Self::finish_open(path, file, 0, lock)?;
        active
            .file
            .set_len(0)
            .map_err(|e| RotateError::open(path, e))?;
        Ok(active)
    }

    fn finish_open(path: &Path, file: File, size: u64, lock: bool) -> RotateResult<Self> {
        if lock && file.try_lock_exclusive().is_err() {
            return Err(RotateError::Locked {
                path: path.to_path_buf(),
            });
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            size,
        })
    }

    /// Appends `data`, returning the number of bytes actually written.
    ///
    /// A short or failed write is not an error: the failure is logged and
    /// only the bytes the OS accepted are counted.
    pub fn append(&mut self, data: &[u8]) -> u64 {
        let written = write_counted(&mut self.file, data);
        if written < data.len() {
            warn!(
                path = ?self.path,
                expected = data.len(),
                written,
                "short write to active file"
            );
        }
        self.size += written as u64;
        written as u64
    }

    /// Returns the number of bytes in the file since it was opened.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Flushes and closes the file, optionally syncing it to disk first.
    ///
    /// The lock, if any, is released when the handle is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError::Close`] if the flush or sync fails. The handle
    /// is closed either way.
    pub fn close(mut self, sync: bool) -> RotateResult<()> {
        let result = self
            .file
            .flush()
            .and_then(|()| if sync { self.file.sync_all() } else { Ok(()) });
        result.map_err(|e| RotateError::close(&self.path, e))
    }
}

/// Writes as much of `data` as the sink accepts, retrying on interrupts.
///
/// Stops at the first error or zero-length write and returns the count of
/// bytes written so far.
pub(crate) fn write_counted<W: Write + ?Sized>(sink: &mut W, data: &[u8]) -> usize {
    let mut written = 0;
    while written < data.len() {
        match sink.write(&data[written..]) {
            Ok(0) => break,
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
    written
}
