//! Compression of retired segments into archives.
//!
//! ## Invariants
//!
//! - An archive is created with exclusive semantics and is never overwritten
//! - The segment is removed only after the archive is fully written and synced
//! - On failure the segment stays on disk and no partial archive remains

use crate::error::{ArchiveError, ArchiveResult};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::Path;

/// A stream compressor for segments.
///
/// Implementations only transform bytes; file creation, exclusivity and
/// cleanup are handled by [`compress_segment`].
pub trait Codec: Send + Sync {
    /// File extension appended to archive names, without the leading dot.
    fn extension(&self) -> &str;

    /// Compresses all of `input` into `output`, finalizing the stream.
    ///
    /// Returns the number of uncompressed bytes consumed.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from reading, compressing or writing.
    fn encode(&self, input: &mut dyn Read, output: &mut dyn Write) -> io::Result<u64>;
}

/// Gzip container via `flate2`.
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    /// Creates a gzip codec at `level` (0-9, clamped).
    #[must_use]
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self {
            level: Compression::default(),
        }
    }
}

impl Codec for GzipCodec {
    fn extension(&self) -> &str {
        "gz"
    }

    fn encode(&self, input: &mut dyn Read, output: &mut dyn Write) -> io::Result<u64> {
        let mut encoder = GzEncoder::new(output, self.level);
        let consumed = io::copy(input, &mut encoder)?;
        encoder.finish()?.flush()?;
        Ok(consumed)
    }
}

/// Outcome of a successful archive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Uncompressed bytes read from the segment.
    pub segment_bytes: u64,
    /// Size of the finished archive.
    pub archive_bytes: u64,
}

/// Compresses `segment` into `archive` and removes the segment.
///
/// # Errors
///
/// - [`ArchiveError::OpenSegment`] if the segment cannot be read
/// - [`ArchiveError::ArchiveExists`] if `archive` is already present
/// - [`ArchiveError::CreateArchive`] if `archive` cannot be created
/// - [`ArchiveError::Encode`] if compression or the final sync fails
/// - [`ArchiveError::RemoveSegment`] if the archive is complete but the
///   segment cannot be deleted
pub fn compress_segment(
    codec: &dyn Codec,
    segment: &Path,
    archive: &Path,
) -> ArchiveResult<ArchiveReport> {
    let source = File::open(segment).map_err(|source| ArchiveError::OpenSegment {
        path: segment.to_path_buf(),
        source,
    })?;

    let mut out = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(archive)
        .map_err(|source| {
            if source.kind() == io::ErrorKind::AlreadyExists {
                ArchiveError::ArchiveExists {
                    path: archive.to_path_buf(),
                }
            } else {
                ArchiveError::CreateArchive {
                    path: archive.to_path_buf(),
                    source,
                }
            }
        })?;

    let written = codec
        .encode(&mut BufReader::new(source), &mut out)
        .and_then(|consumed| {
            out.sync_all()?;
            Ok((consumed, out.metadata()?.len()))
        });
    drop(out);

    let (segment_bytes, archive_bytes) = match written {
        Ok(sizes) => sizes,
        Err(source) => {
            // The archive is ours; a half-written one must not shadow the segment.
            let _ = fs::remove_file(archive);
            return Err(ArchiveError::Encode {
                path: archive.to_path_buf(),
                source,
            });
        }
    };

    fs::remove_file(segment).map_err(|source| ArchiveError::RemoveSegment {
        path: segment.to_path_buf(),
        source,
    })?;

    Ok(ArchiveReport {
        segment_bytes,
        archive_bytes,
    })
}
