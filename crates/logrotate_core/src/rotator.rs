//! The rotation engine.
//!
//! A [`Rotator`] reads lines from an input stream and appends them to the
//! active file. Before each line it checks the size counter against the
//! threshold; once reached, the active file is closed, renamed to the next
//! free segment index, replaced by an empty file, and the segment is handed
//! to a background compression task.
//!
//! ## Invariants
//!
//! - The size counter equals the bytes written to the current active file
//! - The line that triggers a rotation goes to the new active file
//! - A segment is only handed off after its handle is closed and renamed
//! - `close` returns only after every compression task has finished

use crate::active::{write_counted, ActiveFile};
use crate::archive::{Codec, GzipCodec};
use crate::compressor::CompressionSet;
use crate::config::RotatorConfig;
use crate::error::{RotateError, RotateResult};
use crate::naming::SegmentNaming;
use crate::stats::RotatorStats;
use std::fs;
use std::io::{self, BufRead, Stdout, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Writes a line stream to a size-rotated log file.
///
/// # Example
///
/// ```no_run
/// use logrotate_core::{Rotator, RotatorConfig};
///
/// let stdin = std::io::stdin().lock();
/// let config = RotatorConfig::new("app.log").threshold_kb(1024);
/// let mut rotator = Rotator::new(stdin, config).unwrap();
/// let result = rotator.run();
/// rotator.close().unwrap();
/// result.unwrap();
/// ```
pub struct Rotator<R, W = Stdout> {
    input: R,
    passthrough: Option<W>,
    naming: SegmentNaming,
    threshold: u64,
    lock: bool,
    sync_on_close: bool,
    /// `None` only after `close` has taken it, or after a failed rotation.
    active: Option<ActiveFile>,
    compressions: CompressionSet,
    stats: Arc<RotatorStats>,
}

impl<R: BufRead> Rotator<R, Stdout> {
    /// Opens the active file and prepares to read from `input`.
    ///
    /// With `config.tee` set, lines are echoed to standard output.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the active file
    /// cannot be opened, stat'ed or locked.
    pub fn new(input: R, config: RotatorConfig) -> RotateResult<Self> {
        Self::with_passthrough(input, config, io::stdout())
    }
}

impl<R: BufRead, W: Write> Rotator<R, W> {
    /// Like [`Rotator::new`], echoing to `sink` when `config.tee` is set.
    ///
    /// # Errors
    ///
    /// See [`Rotator::new`].
    pub fn with_passthrough(input: R, config: RotatorConfig, sink: W) -> RotateResult<Self> {
        let codec = GzipCodec::new(config.compression_level);
        Self::with_codec(input, config, sink, Arc::new(codec))
    }

    /// Builds an engine that archives segments with `codec`.
    ///
    /// # Errors
    ///
    /// See [`Rotator::new`].
    pub fn with_codec(
        input: R,
        config: RotatorConfig,
        sink: W,
        codec: Arc<dyn Codec>,
    ) -> RotateResult<Self> {
        config.validate()?;

        let active = ActiveFile::open_append(&config.path, config.lock)?;
        let naming = SegmentNaming::new(&config.path, codec.extension());
        let stats = Arc::new(RotatorStats::new());

        info!(
            path = ?config.path,
            size = active.size(),
            threshold = config.threshold_bytes(),
            "opened active log file"
        );

        Ok(Self {
            input,
            passthrough: config.tee.then_some(sink),
            naming,
            threshold: config.threshold_bytes(),
            lock: config.lock,
            sync_on_close: config.sync_on_close,
            active: Some(active),
            compressions: CompressionSet::new(codec, Arc::clone(&stats)),
            stats,
        })
    }

    /// Reads the input to the end, writing and rotating as needed.
    ///
    /// Lines are split on `\n`; a trailing `\r` is dropped and every line is
    /// written back with a single `\n`. A last line without a terminator is
    /// still written.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError::Input`] if the input cannot be read, or any
    /// rotation error. Either way the loop stops; `close` must still be
    /// called to drain background compression.
    pub fn run(&mut self) -> RotateResult<()> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let n = self
                .input
                .read_until(b'\n', &mut buf)
                .map_err(RotateError::Input)?;
            if n == 0 {
                return Ok(());
            }
            let line = trim_line_ending(&buf);
            self.write_line(line)?;
        }
    }

    /// Writes one line (without terminator), rotating first if the active
    /// file has reached the threshold.
    ///
    /// # Errors
    ///
    /// Returns any error from [`Rotator::rotate`].
    pub fn write_line(&mut self, line: &[u8]) -> RotateResult<()> {
        if self.current_size() >= self.threshold {
            self.rotate()?;
        }

        let active = self.active_mut()?;
        let written = active.append(line) + active.append(b"\n");
        self.stats.record_line(written);

        if let Some(sink) = self.passthrough.as_mut() {
            let echoed = write_counted(sink, line) + write_counted(sink, b"\n");
            if echoed < line.len() + 1 {
                self.stats.record_passthrough_error();
            }
        }

        Ok(())
    }

    /// Retires the active file and starts a fresh one.
    ///
    /// Returns the path of the retired segment, which is compressed in the
    /// background.
    ///
    /// # Errors
    ///
    /// - [`RotateError::Scan`] if the directory cannot be listed
    /// - [`RotateError::Close`] if the active file cannot be flushed
    /// - [`RotateError::Rename`] if the active file cannot be renamed
    /// - [`RotateError::Open`] or [`RotateError::Locked`] if the new active
    ///   file cannot be created
    ///
    /// After a rename or create failure the engine has no active file and
    /// further writes fail.
    pub fn rotate(&mut self) -> RotateResult<PathBuf> {
        let (segment, retired_size) = self.retire_active()?;
        let fresh = ActiveFile::create(self.naming.base(), self.lock);
        self.install_fresh(segment, retired_size, fresh)
    }

    /// Closes the active file and renames it to the next free segment.
    fn retire_active(&mut self) -> RotateResult<(PathBuf, u64)> {
        let index = self.naming.scan_max_index()? + 1;
        let segment = self.naming.segment_path(index);
        let base = self.naming.base().to_path_buf();

        let old = self.take_active()?;
        let retired_size = old.size();
        old.close(false)?;

        fs::rename(&base, &segment).map_err(|source| RotateError::Rename {
            from: base,
            to: segment.clone(),
            source,
        })?;
        Ok((segment, retired_size))
    }

    /// Hands the renamed segment to compression and adopts the new file.
    fn install_fresh(
        &mut self,
        segment: PathBuf,
        retired_size: u64,
        fresh: RotateResult<ActiveFile>,
    ) -> RotateResult<PathBuf> {
        // The segment is complete even if the new active file is not.
        let archive = self.naming.archive_path_for(&segment);
        self.compressions.spawn(segment.clone(), archive);

        self.active = Some(fresh?);
        self.stats.record_rotation();
        info!(segment = ?segment, size = retired_size, "rotated active log file");
        Ok(segment)
    }

    /// Closes the active file and waits for all background compression.
    ///
    /// # Errors
    ///
    /// Returns [`RotateError::Close`] if flushing or syncing the active file
    /// failed. Compression still completes before the error is returned.
    pub fn close(mut self) -> RotateResult<()> {
        self.shutdown()
    }

    /// Returns the bytes written to the active file since it was opened.
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.active.as_ref().map_or(0, ActiveFile::size)
    }

    /// Returns the rotation threshold in bytes.
    #[must_use]
    pub fn threshold_bytes(&self) -> u64 {
        self.threshold
    }

    /// Returns the base path of the active file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.naming.base()
    }

    /// Returns the engine's counters.
    #[must_use]
    pub fn stats(&self) -> Arc<RotatorStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the number of compression tasks still running.
    #[must_use]
    pub fn pending_compressions(&self) -> usize {
        self.compressions.pending()
    }

    fn active_mut(&mut self) -> RotateResult<&mut ActiveFile> {
        let base = self.naming.base();
        self.active.as_mut().ok_or_else(|| no_active_file(base))
    }

    fn take_active(&mut self) -> RotateResult<ActiveFile> {
        let base = self.naming.base();
        self.active.take().ok_or_else(|| no_active_file(base))
    }

    fn shutdown(&mut self) -> RotateResult<()> {
        let result = match self.active.take() {
            Some(active) => active.close(self.sync_on_close),
            None => Ok(()),
        };
        if let Some(sink) = self.passthrough.as_mut() {
            let _ = sink.flush();
        }

        let pending = self.compressions.pending();
        if pending > 0 {
            debug!(pending, "waiting for background compression");
        }
        self.compressions.drain();
        result
    }
}

impl<R, W> Drop for Rotator<R, W> {
    fn drop(&mut self) {
        // `close` already drained; this covers engines dropped without it.
        drop(self.active.take());
        self.compressions.drain();
    }
}

impl<R, W> std::fmt::Debug for Rotator<R, W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rotator")
            .field("path", &self.naming.base())
            .field("threshold", &self.threshold)
            .field("size", &self.active.as_ref().map(ActiveFile::size))
            .field("tee", &self.passthrough.is_some())
            .field("compressions", &self.compressions)
            .finish_non_exhaustive()
    }
}

fn no_active_file(base: &Path) -> RotateError {
    RotateError::open(
        base,
        io::Error::new(io::ErrorKind::NotFound, "no active file after failed rotation"),
    )
}

/// Strips a trailing `\n` and then a trailing `\r`.
fn trim_line_ending(buf: &[u8]) -> &[u8] {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    line.strip_suffix(b"\r").unwrap_or(line)
}
