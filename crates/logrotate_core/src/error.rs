//! Error types for the rotation engine.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for foreground engine operations.
pub type RotateResult<T> = Result<T, RotateError>;

/// Result type for background archive operations.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Errors that stop the ingestion loop.
///
/// Every variant is fatal: once one of these is returned the engine may no
/// longer hold a usable active file.
#[derive(Debug, Error)]
pub enum RotateError {
    /// The active file could not be opened or created.
    #[error("cannot open active file {path:?}: {source}")]
    Open {
        /// Path of the active file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Another writer holds the lock on the active file.
    #[error("active file {path:?} is locked by another writer")]
    Locked {
        /// Path of the active file.
        path: PathBuf,
    },

    /// The directory holding the active file could not be listed.
    #[error("cannot scan {dir:?} for rotated segments: {source}")]
    Scan {
        /// Directory that was being listed.
        dir: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The active file could not be renamed to its segment name.
    #[error("cannot rename {from:?} to {to:?}: {source}")]
    Rename {
        /// The active file path.
        from: PathBuf,
        /// The segment path.
        to: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Closing (flushing or syncing) the active file failed.
    #[error("cannot close active file {path:?}: {source}")]
    Close {
        /// Path of the active file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Reading from the input stream failed.
    #[error("input read error: {0}")]
    Input(#[source] io::Error),

    /// The engine configuration is unusable.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl RotateError {
    /// Creates an open error for `path`.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }

    /// Creates a close error for `path`.
    pub fn close(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Close {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// Errors from compressing a retired segment.
///
/// These never reach the ingestion loop. The segment is left on disk
/// whenever one of them occurs.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The retired segment could not be opened for reading.
    #[error("cannot open segment {path:?}: {source}")]
    OpenSegment {
        /// Segment path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An archive with the same index already exists.
    #[error("archive {path:?} already exists")]
    ArchiveExists {
        /// Archive path.
        path: PathBuf,
    },

    /// The archive file could not be created.
    #[error("cannot create archive {path:?}: {source}")]
    CreateArchive {
        /// Archive path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Compressing or finalizing the archive failed.
    #[error("cannot write archive {path:?}: {source}")]
    Encode {
        /// Archive path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The archive was written but the segment could not be removed.
    #[error("archived but cannot remove segment {path:?}: {source}")]
    RemoveSegment {
        /// Segment path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
