//! End-to-end tests for rotation, archiving and shutdown.

use flate2::read::GzDecoder;
use logrotate_core::{Codec, GzipCodec, RotateError, Rotator, RotatorConfig, SegmentNaming};
use proptest::prelude::*;
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::tempdir;

/// Reassembles everything ever written under `base`, oldest segment first.
fn reassemble(base: &Path) -> Vec<u8> {
    let naming = SegmentNaming::new(base, "gz");
    let mut indices: Vec<u64> = fs::read_dir(naming.dir())
        .unwrap()
        .filter_map(|e| {
            let name = e.unwrap().file_name();
            naming.parse_index(name.to_str()?)
        })
        .collect();
    indices.sort_unstable();
    indices.dedup();

    let mut out = Vec::new();
    for index in indices {
        let archive = naming.archive_path(index);
        let segment = naming.segment_path(index);
        assert!(
            archive.exists() != segment.exists(),
            "index {index} must have exactly one of segment or archive"
        );
        if archive.exists() {
            out.extend(gunzip(&archive));
        } else {
            out.extend(fs::read(&segment).unwrap());
        }
    }
    out.extend(fs::read(base).unwrap());
    out
}

fn gunzip(path: &Path) -> Vec<u8> {
    let mut data = Vec::new();
    GzDecoder::new(File::open(path).unwrap())
        .read_to_end(&mut data)
        .unwrap();
    data
}

/// Fails on any segment containing a marker line.
struct PoisonCodec;

impl Codec for PoisonCodec {
    fn extension(&self) -> &str {
        "gz"
    }

    fn encode(&self, input: &mut dyn Read, output: &mut dyn Write) -> io::Result<u64> {
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        if data.windows(6).any(|w| w == b"poison") {
            return Err(io::Error::new(io::ErrorKind::Other, "simulated I/O error"));
        }
        GzipCodec::default().encode(&mut data.as_slice(), output)
    }
}

/// Gzip, but slow enough that several tasks overlap.
struct SlowCodec;

impl Codec for SlowCodec {
    fn extension(&self) -> &str {
        "gz"
    }

    fn encode(&self, input: &mut dyn Read, output: &mut dyn Write) -> io::Result<u64> {
        thread::sleep(Duration::from_millis(50));
        GzipCodec::default().encode(input, output)
    }
}

#[test]
fn rotates_at_threshold_and_archives() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");

    // 100 lines of 100 bytes each (with newline) against a 1000-byte threshold.
    let line = format!("{}\n", "y".repeat(99));
    let input = Cursor::new(line.repeat(100).into_bytes());
    let config = RotatorConfig::new(&base).threshold_kb(1);

    let mut rotator = Rotator::with_passthrough(input, config, io::sink()).unwrap();
    rotator.run().unwrap();
    let stats = rotator.stats();
    rotator.close().unwrap();

    assert_eq!(stats.rotations(), 9);
    assert_eq!(stats.archives_completed(), 9);
    assert_eq!(stats.lines(), 100);
    for index in 1..=9 {
        let archive = dir.path().join(format!("app.log.{index}.gz"));
        assert_eq!(gunzip(&archive).len(), 1000);
        assert!(!dir.path().join(format!("app.log.{index}")).exists());
    }
    assert_eq!(fs::read(&base).unwrap().len(), 1000);
    assert_eq!(reassemble(&base), line.repeat(100).into_bytes());
}

#[test]
fn numbering_skips_gaps() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");
    fs::write(dir.path().join("app.log.1.gz"), b"").unwrap();
    fs::write(dir.path().join("app.log.2.gz"), b"").unwrap();
    fs::write(dir.path().join("app.log.4.gz"), b"").unwrap();
    fs::write(dir.path().join("app.log.notes"), b"").unwrap();

    let config = RotatorConfig::new(&base);
    let mut rotator = Rotator::with_passthrough(io::empty(), config, io::sink()).unwrap();
    rotator.write_line(b"hello").unwrap();
    let segment = rotator.rotate().unwrap();
    rotator.close().unwrap();

    assert_eq!(segment, dir.path().join("app.log.5"));
    assert!(!dir.path().join("app.log.3.gz").exists());
    assert_eq!(gunzip(&dir.path().join("app.log.5.gz")), b"hello\n");
}

#[test]
fn failed_compression_leaves_segment_and_numbering_continues() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");

    let config = RotatorConfig::new(&base);
    let mut rotator =
        Rotator::with_codec(io::empty(), config, io::sink(), Arc::new(PoisonCodec)).unwrap();
    for line in ["a", "b", "poison", "c"] {
        rotator.write_line(line.as_bytes()).unwrap();
        rotator.rotate().unwrap();
    }
    rotator.write_line(b"d").unwrap();
    let stats = rotator.stats();
    rotator.close().unwrap();

    assert_eq!(stats.archives_completed(), 3);
    assert_eq!(stats.archives_failed(), 1);
    assert_eq!(fs::read(dir.path().join("app.log.3")).unwrap(), b"poison\n");
    assert!(!dir.path().join("app.log.3.gz").exists());
    assert_eq!(gunzip(&dir.path().join("app.log.4.gz")), b"c\n");
    assert_eq!(fs::read(&base).unwrap(), b"d\n");
    assert_eq!(reassemble(&base), b"a\nb\npoison\nc\nd\n");
}

#[test]
fn close_waits_for_in_flight_compression() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");

    let config = RotatorConfig::new(&base);
    let mut rotator =
        Rotator::with_codec(io::empty(), config, io::sink(), Arc::new(SlowCodec)).unwrap();
    for i in 0..5 {
        rotator.write_line(format!("line {i}").as_bytes()).unwrap();
        rotator.rotate().unwrap();
    }
    assert!(rotator.pending_compressions() > 0);
    let stats = rotator.stats();
    rotator.close().unwrap();

    assert_eq!(stats.archives_completed(), 5);
    for index in 1..=5 {
        assert!(dir.path().join(format!("app.log.{index}.gz")).exists());
        assert!(!dir.path().join(format!("app.log.{index}")).exists());
    }
}

#[test]
fn restart_seeds_size_from_existing_file() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");
    fs::write(&base, vec![b'z'; 900]).unwrap();

    let config = RotatorConfig::new(&base).threshold_kb(1);
    let mut rotator = Rotator::with_passthrough(io::empty(), config, io::sink()).unwrap();
    assert_eq!(rotator.current_size(), 900);

    rotator.write_line(&[b'q'; 199]).unwrap();
    assert_eq!(rotator.current_size(), 1100);
    assert_eq!(rotator.stats().rotations(), 0);

    rotator.write_line(b"after").unwrap();
    assert_eq!(rotator.current_size(), 6);
    assert_eq!(rotator.stats().rotations(), 1);
    rotator.close().unwrap();

    assert_eq!(gunzip(&dir.path().join("app.log.1.gz")).len(), 1100);
}

#[test]
fn second_writer_is_locked_out() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");

    let first =
        Rotator::with_passthrough(io::empty(), RotatorConfig::new(&base), io::sink()).unwrap();
    let second = Rotator::with_passthrough(io::empty(), RotatorConfig::new(&base), io::sink());
    assert!(matches!(second, Err(RotateError::Locked { .. })));
    first.close().unwrap();
}

#[test]
fn missing_directory_fails_construction() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("missing").join("app.log");

    let result = Rotator::with_passthrough(io::empty(), RotatorConfig::new(&base), io::sink());
    assert!(matches!(result, Err(RotateError::Open { .. })));
}

#[test]
fn drop_without_close_still_drains() {
    let dir = tempdir().unwrap();
    let base = dir.path().join("app.log");

    {
        let config = RotatorConfig::new(&base);
        let mut rotator =
            Rotator::with_codec(io::empty(), config, io::sink(), Arc::new(SlowCodec)).unwrap();
        rotator.write_line(b"dropped").unwrap();
        rotator.rotate().unwrap();
    }

    assert!(dir.path().join("app.log.1.gz").exists());
    assert!(!dir.path().join("app.log.1").exists());
}

fn line_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-zA-Z0-9 ]{0,300}", 0..60)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn no_line_lost_or_duplicated(lines in line_strategy()) {
        let dir = tempdir().unwrap();
        let base = dir.path().join("app.log");

        let mut input = Vec::new();
        for line in &lines {
            input.extend_from_slice(line.as_bytes());
            input.push(b'\n');
        }

        let config = RotatorConfig::new(&base).threshold_kb(1);
        let mut rotator =
            Rotator::with_passthrough(Cursor::new(input.clone()), config, io::sink()).unwrap();
        rotator.run().unwrap();
        rotator.close().unwrap();

        prop_assert_eq!(reassemble(&base), input);
    }

    #[test]
    fn rotated_segments_respect_threshold(lines in line_strategy()) {
        let dir = tempdir().unwrap();
        let base = dir.path().join("app.log");

        let config = RotatorConfig::new(&base).threshold_kb(1);
        let mut rotator =
            Rotator::with_passthrough(io::empty(), config, io::sink()).unwrap();
        for line in &lines {
            rotator.write_line(line.as_bytes()).unwrap();
        }
        rotator.close().unwrap();

        // A segment only retires once it reached the threshold, and it never
        // overshoots by more than the line that pushed it over.
        let naming = SegmentNaming::new(&base, "gz");
        for index in 1.. {
            let archive = naming.archive_path(index);
            if !archive.exists() {
                break;
            }
            let len = gunzip(&archive).len();
            prop_assert!(len >= 1000);
            prop_assert!(len < 1000 + 301);
        }
    }
}
