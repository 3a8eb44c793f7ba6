//! Background compression of retired segments.
//!
//! Each rotation hands its segment to a dedicated thread and keeps the join
//! handle. Tasks never touch the engine's active file or size counter; the
//! only thing they report back is completion (plus counters in
//! [`RotatorStats`]). Shutdown joins every handle.

use crate::archive::{compress_segment, Codec};
use crate::stats::RotatorStats;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// The set of compression tasks that have not yet been joined.
pub struct CompressionSet {
    codec: Arc<dyn Codec>,
    stats: Arc<RotatorStats>,
    handles: Vec<JoinHandle<()>>,
}

impl CompressionSet {
    /// Creates an empty set that compresses with `codec`.
    pub fn new(codec: Arc<dyn Codec>, stats: Arc<RotatorStats>) -> Self {
        Self {
            codec,
            stats,
            handles: Vec::new(),
        }
    }

    /// Starts compressing `segment` into `archive` in the background.
    ///
    /// Finished tasks are reaped first. If no thread can be spawned the
    /// work runs on the calling thread instead.
    pub fn spawn(&mut self, segment: PathBuf, archive: PathBuf) {
        self.reap();

        let codec = Arc::clone(&self.codec);
        let stats = Arc::clone(&self.stats);
        let name = format!(
            "logrotate-gz-{}",
            segment
                .extension()
                .map(|ext| ext.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        // Kept so the work can be retried inline if the spawn fails.
        let fallback = (segment.clone(), archive.clone());

        let spawned = thread::Builder::new()
            .name(name)
            .spawn(move || run_task(codec.as_ref(), &stats, segment, archive));

        match spawned {
            Ok(handle) => self.handles.push(handle),
            Err(e) => {
                warn!(
                    error = %e,
                    segment = ?fallback.0,
                    "cannot spawn compression thread, compressing inline"
                );
                run_task(self.codec.as_ref(), &self.stats, fallback.0, fallback.1);
            }
        }
    }

    /// Returns the number of tasks that are still running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    /// Blocks until every outstanding task has finished.
    pub fn drain(&mut self) {
        for handle in self.handles.drain(..) {
            join(handle, &self.stats);
        }
    }

    fn reap(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) =
            self.handles.drain(..).partition(|h| h.is_finished());
        self.handles = running;
        for handle in finished {
            join(handle, &self.stats);
        }
    }
}

impl std::fmt::Debug for CompressionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompressionSet")
            .field("extension", &self.codec.extension())
            .field("outstanding", &self.handles.len())
            .finish_non_exhaustive()
    }
}

fn join(handle: JoinHandle<()>, stats: &RotatorStats) {
    if handle.join().is_err() {
        warn!("compression thread panicked; segment left uncompressed");
        stats.record_archive(false);
    }
}

fn run_task(codec: &dyn Codec, stats: &RotatorStats, segment: PathBuf, archive: PathBuf) {
    match compress_segment(codec, &segment, &archive) {
        Ok(report) => {
            info!(
                archive = ?archive,
                segment_bytes = report.segment_bytes,
                archive_bytes = report.archive_bytes,
                "segment archived"
            );
            stats.record_archive(true);
        }
        Err(e) => {
            warn!(segment = ?segment, error = %e, "segment left uncompressed");
            stats.record_archive(false);
        }
    }
}
