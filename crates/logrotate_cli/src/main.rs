//! logrotate CLI
//!
//! Writes lines from standard input to a log file, rotating it into
//! numbered gzip archives once it grows past a size threshold.
//!
//! ```text
//! <process that outputs to stdout> | logrotate [-t] [-c <N>] <filename>
//! ```

use clap::Parser;
use logrotate_core::{Rotator, RotatorConfig, DEFAULT_COMPRESSION_LEVEL, DEFAULT_THRESHOLD_KB};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Writes and rotates logs read from stdin.
#[derive(Parser)]
#[command(name = "logrotate")]
#[command(author, version, about, long_about = None)]
#[command(override_usage = "<process that outputs to stdout> | logrotate [-t] [-c <N>] <FILENAME>")]
struct Cli {
    /// Log file to write; rotated segments are stored next to it
    filename: PathBuf,

    /// Behave like tee(1): also copy every line to stdout
    #[arg(short = 't', long)]
    tee: bool,

    /// Max (uncompressed) logfile size in kB
    #[arg(short = 'c', long = "threshold-kb", default_value_t = DEFAULT_THRESHOLD_KB)]
    threshold_kb: u64,

    /// Gzip compression level for archives (0-9)
    #[arg(short = 'l', long, default_value_t = DEFAULT_COMPRESSION_LEVEL)]
    level: u32,

    /// Do not take an exclusive lock on the log file
    #[arg(long)]
    no_lock: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout may carry the tee stream, so diagnostics go to stderr.
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = RotatorConfig::new(&cli.filename)
        .threshold_kb(cli.threshold_kb)
        .tee(cli.tee)
        .compression_level(cli.level)
        .lock(!cli.no_lock);

    let mut rotator = match Rotator::new(io::stdin().lock(), config) {
        Ok(rotator) => rotator,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let run = rotator.run();
    if let Err(e) = &run {
        error!("{e}");
    }

    let stats = rotator.stats();
    let closed = rotator.close();
    if let Err(e) = &closed {
        error!("{e}");
    }

    let snap = stats.snapshot();
    info!(
        lines = snap.lines,
        bytes = snap.bytes_written,
        rotations = snap.rotations,
        archived = snap.archives_completed,
        failed = snap.archives_failed,
        tee_errors = snap.passthrough_errors,
        "logrotate finished"
    );

    if run.is_ok() && closed.is_ok() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
