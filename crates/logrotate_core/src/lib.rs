//! # logrotate core
//!
//! Size-based log rotation engine.
//!
//! Lines read from an input stream are appended to an active file. Once the
//! file reaches a size threshold it is renamed to the next numbered segment
//! and a fresh active file takes its place. Each retired segment is gzipped
//! on a background thread and removed once its archive is complete.
//!
//! ## On-disk layout
//!
//! ```text
//! app.log        # active file
//! app.log.7      # retired segment, compression in progress (or failed)
//! app.log.6.gz   # archive
//! ```
//!
//! ## Example
//!
//! ```rust
//! use logrotate_core::{Rotator, RotatorConfig};
//! use std::io::Cursor;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let config = RotatorConfig::new(dir.path().join("app.log")).threshold_kb(1);
//! let input = Cursor::new(b"first line\nsecond line\n".to_vec());
//!
//! let mut rotator = Rotator::with_passthrough(input, config, std::io::sink()).unwrap();
//! rotator.run().unwrap();
//! rotator.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod active;
mod archive;
mod compressor;
mod config;
mod error;
mod naming;
mod rotator;
mod stats;

pub use active::ActiveFile;
pub use archive::{compress_segment, ArchiveReport, Codec, GzipCodec};
pub use compressor::CompressionSet;
pub use config::{RotatorConfig, DEFAULT_COMPRESSION_LEVEL, DEFAULT_THRESHOLD_KB};
pub use error::{ArchiveError, ArchiveResult, RotateError, RotateResult};
pub use naming::SegmentNaming;
pub use rotator::Rotator;
pub use stats::{RotatorStats, StatsSnapshot};
