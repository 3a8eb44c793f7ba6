//! Rotation statistics.
//!
//! Counters are shared with background compression tasks through an `Arc`.
//! They are diagnostics only: the engine never reads them to make a
//! decision.

use std::sync::atomic::{AtomicU64, Ordering};

/// Counters describing the work an engine has done.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct RotatorStats {
    /// Lines accepted from the input.
    lines: AtomicU64,
    /// Bytes written to active files.
    bytes_written: AtomicU64,
    /// Completed rotations.
    rotations: AtomicU64,
    /// Segments successfully archived.
    archives_completed: AtomicU64,
    /// Segments left uncompressed after a failure.
    archives_failed: AtomicU64,
    /// Lines that could not be fully echoed to the passthrough sink.
    passthrough_errors: AtomicU64,
}

impl RotatorStats {
    /// Creates a zeroed stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_line(&self, bytes: u64) {
        self.lines.fetch_add(1, Ordering::Relaxed);
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    pub(crate) fn record_rotation(&self) {
        self.rotations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_archive(&self, ok: bool) {
        let counter = if ok {
            &self.archives_completed
        } else {
            &self.archives_failed
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_passthrough_error(&self) {
        self.passthrough_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of lines accepted.
    pub fn lines(&self) -> u64 {
        self.lines.load(Ordering::Relaxed)
    }

    /// Returns the number of bytes written to active files.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written.load(Ordering::Relaxed)
    }

    /// Returns the number of rotations.
    pub fn rotations(&self) -> u64 {
        self.rotations.load(Ordering::Relaxed)
    }

    /// Returns the number of archived segments.
    pub fn archives_completed(&self) -> u64 {
        self.archives_completed.load(Ordering::Relaxed)
    }

    /// Returns the number of segments whose compression failed.
    pub fn archives_failed(&self) -> u64 {
        self.archives_failed.load(Ordering::Relaxed)
    }

    /// Returns the number of passthrough write failures.
    pub fn passthrough_errors(&self) -> u64 {
        self.passthrough_errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            lines: self.lines(),
            bytes_written: self.bytes_written(),
            rotations: self.rotations(),
            archives_completed: self.archives_completed(),
            archives_failed: self.archives_failed(),
            passthrough_errors: self.passthrough_errors(),
        }
    }
}

/// A point-in-time copy of [`RotatorStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Lines accepted from the input.
    pub lines: u64,
    /// Bytes written to active files.
    pub bytes_written: u64,
    /// Completed rotations.
    pub rotations: u64,
    /// Segments successfully archived.
    pub archives_completed: u64,
    /// Segments left uncompressed after a failure.
    pub archives_failed: u64,
    /// Passthrough write failures.
    pub passthrough_errors: u64,
}
