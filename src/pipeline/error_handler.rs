use anyhow::Result;
use log::warn;
use std::path::PathBuf;

use super::context::{FirstError, SkippedPaths};

/// Record one unreadable path. Strict keeps the first message as the scan's error;
/// otherwise the path is remembered once and the scan goes on. Walk and probe both hit the
/// same unreadable directory, so a repeat path is ignored.
pub fn record_scan_error(
    strict: bool,
    first_error: &FirstError,
    skipped_paths: &SkippedPaths,
    path: PathBuf,
    msg: String,
) {
    if strict {
        first_error.lock().unwrap().get_or_insert(msg);
        return;
    }
    let mut skipped = skipped_paths.lock().unwrap();
    if !skipped.iter().any(|(p, _)| *p == path) {
        skipped.push((path, msg));
    }
}

/// Check scan result: if strict and a first error was recorded, return it; otherwise log skipped paths.
/// Call after joining walk and workers.
pub fn check_for_initial_error_or_skipped_paths(
    strict: bool,
    verbose: bool,
    first_error: &FirstError,
    skipped_paths: &SkippedPaths,
) -> Result<()> {
    if strict && let Some(msg) = first_error.lock().unwrap().take() {
        return Err(anyhow::anyhow!("{}", msg));
    }
    let skipped = skipped_paths.lock().unwrap();
    if !skipped.is_empty() {
        warn!(
            "Skipped {} directories due to permission errors or access issues",
            skipped.len()
        );
        if verbose {
            for (p, msg) in skipped.iter() {
                eprintln!("  skipped: {} ({})", p.display(), msg);
            }
        }
    }
    Ok(())
}
