//! Engine configuration.

use crate::error::{RotateError, RotateResult};
use std::path::{Path, PathBuf};

/// Default rotation threshold, in kilobytes.
pub const DEFAULT_THRESHOLD_KB: u64 = 5000;

/// Default gzip compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Bytes per configured kilobyte.
const BYTES_PER_KB: u64 = 1000;

/// Configuration for a [`crate::Rotator`].
#[derive(Debug, Clone)]
pub struct RotatorConfig {
    /// Base path of the active log file.
    pub path: PathBuf,

    /// Rotation threshold in (decimal) kilobytes.
    pub threshold_kb: u64,

    /// Whether every line is also echoed to the passthrough sink.
    pub tee: bool,

    /// Gzip level used for archives (0-9).
    pub compression_level: u32,

    /// Whether the active file holds an exclusive advisory lock.
    pub lock: bool,

    /// Whether `close` syncs the active file to disk.
    pub sync_on_close: bool,
}

impl RotatorConfig {
    /// Creates a configuration with default values for the given base path.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            threshold_kb: DEFAULT_THRESHOLD_KB,
            tee: false,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            lock: true,
            sync_on_close: true,
        }
    }

    /// Sets the rotation threshold in kilobytes.
    #[must_use]
    pub fn threshold_kb(mut self, kb: u64) -> Self {
        self.threshold_kb = kb;
        self
    }

    /// Sets tee mode.
    #[must_use]
    pub fn tee(mut self, value: bool) -> Self {
        self.tee = value;
        self
    }

    /// Sets the gzip compression level.
    #[must_use]
    pub fn compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    /// Sets whether the active file is locked.
    #[must_use]
    pub fn lock(mut self, value: bool) -> Self {
        self.lock = value;
        self
    }

    /// Sets whether `close` syncs the active file.
    #[must_use]
    pub fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Returns the rotation threshold in bytes.
    #[must_use]
    pub fn threshold_bytes(&self) -> u64 {
        self.threshold_kb.saturating_mul(BYTES_PER_KB)
    }

    /// Checks that the configuration can drive an engine.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError::InvalidConfig`] if the path is empty, the
    /// threshold is zero or the compression level is out of range.
    pub fn validate(&self) -> RotateResult<()> {
        if self.path.as_os_str().is_empty() {
            return Err(RotateError::invalid_config("output path is empty"));
        }
        if self.path.file_name().is_none() {
            return Err(RotateError::invalid_config(format!(
                "output path has no file name: {}",
                self.path.display()
            )));
        }
        if self.threshold_kb == 0 {
            return Err(RotateError::invalid_config("threshold must be at least 1 kB"));
        }
        if self.compression_level > 9 {
            return Err(RotateError::invalid_config(format!(
                "compression level {} is out of range 0-9",
                self.compression_level
            )));
        }
        Ok(())
    }
}
