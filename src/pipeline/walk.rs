//! Discovery walk: one thread walks directories in name order and feeds the probe workers.

use crossbeam_channel::Sender;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use walkdir::{DirEntry, WalkDir};

use crate::engine::tools::should_include_in_walk;

use super::context::ScanContext;
use super::error_handler::record_scan_error;

/// Counts from one walk.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Directories handed to the probe workers.
    pub sent: usize,
    /// Directories the walk could not read.
    pub unreadable: usize,
}

/// Directories only; excluded subtrees and the run's own state are never entered.
fn is_walkable(entry: &DirEntry, ctx: &ScanContext) -> bool {
    entry.file_type().is_dir()
        && should_include_in_walk(entry.path(), &ctx.root, &ctx.skip, &ctx.exclude)
}

/// Path to blame for a walk error. walkdir leaves it out for some errors; then the directory
/// sent last is the best guess.
fn error_path(err: &walkdir::Error, last_sent: Option<&PathBuf>) -> PathBuf {
    match (err.path(), last_sent) {
        (Some(p), _) => p.to_path_buf(),
        (None, Some(last)) => last.clone(),
        (None, None) => PathBuf::from("<unknown>"),
    }
}

pub fn spawn_walk_thread(dir_tx: Sender<PathBuf>, ctx: ScanContext) -> JoinHandle<WalkStats> {
    thread::spawn(move || run_walk_loop(dir_tx, &ctx))
}

/// Send every walkable directory to `dir_tx`. Unreadable ones go to the error/skip state;
/// in strict mode the first one stops the walk. `dir_tx` is dropped on return so probe
/// workers drain and exit.
pub fn run_walk_loop(dir_tx: Sender<PathBuf>, ctx: &ScanContext) -> WalkStats {
    let mut stats = WalkStats::default();
    let mut last_sent: Option<PathBuf> = None;
    let walker = WalkDir::new(&ctx.root)
        .follow_links(ctx.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| is_walkable(e, ctx));

    for result in walker {
        match result {
            Ok(entry) => {
                let path = entry.into_path();
                if dir_tx.send(path.clone()).is_err() {
                    break;
                }
                stats.sent += 1;
                last_sent = Some(path);
            }
            Err(err) => {
                stats.unreadable += 1;
                let path = error_path(&err, last_sent.as_ref());
                record_scan_error(
                    ctx.strict,
                    &ctx.first_error,
                    &ctx.skipped_paths,
                    path,
                    err.to_string(),
                );
                if ctx.strict {
                    break;
                }
            }
        }
    }
    stats
}
