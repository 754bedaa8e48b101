//! Scan context and channels: shared state passed into the walk thread and probe workers.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::engine::progress::ProgressBar;
use crate::{Opts, ScanPolicy};

use super::walk::WalkStats;

/// Shared error/skip state. Walk thread and probe workers both record into it.
pub type FirstError = Arc<Mutex<Option<String>>>;
pub type SkippedPaths = Arc<Mutex<Vec<(PathBuf, String)>>>;

/// Everything the walk loop needs: root, what not to descend into, and error/skip state.
pub struct ScanContext {
    pub root: PathBuf,
    /// The run's own state paths (temp dir, checkpoint) when they sit under the root.
    pub skip: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub strict: bool,
    pub follow_links: bool,
    pub first_error: FirstError,
    pub skipped_paths: SkippedPaths,
}

/// What each probe worker needs to decide whether a directory is a work unit.
#[derive(Clone)]
pub struct ProbeContext {
    pub suffixes: Vec<String>,
    pub policy: ScanPolicy,
    /// Same filters as the walk, so a subtree probe never reports a pruned directory.
    pub root: PathBuf,
    pub skip: Vec<PathBuf>,
    pub exclude: Vec<String>,
    pub follow_links: bool,
    pub strict: bool,
    pub first_error: FirstError,
    pub skipped_paths: SkippedPaths,
    pub bar: Option<ProgressBar>,
}

/// Handles returned by [`run_scan`](super::run_scan): receive found directories, then join.
pub struct ScanHandles {
    pub found_rx: Receiver<PathBuf>,
    pub walk_handle: JoinHandle<WalkStats>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub first_error: FirstError,
    pub skipped_paths: SkippedPaths,
    /// Discovery bar, finished by the caller after joining.
    pub bar: Option<ProgressBar>,
}

/// Walk thread gets dir_tx + ctx; probe workers get dir_rx, found_tx and probe.
pub struct ScanChannels {
    pub dir_tx: Sender<PathBuf>,
    pub dir_rx: Receiver<PathBuf>,
    pub found_tx: Sender<PathBuf>,
    pub found_rx: Receiver<PathBuf>,
    pub ctx: ScanContext,
    pub probe: ProbeContext,
}

pub fn create_scan_channels(
    root: &std::path::Path,
    skip: Vec<PathBuf>,
    opts: &Opts,
    channel_cap: usize,
    bar: Option<ProgressBar>,
) -> ScanChannels {
    let (dir_tx, dir_rx) = bounded::<PathBuf>(channel_cap);
    let (found_tx, found_rx) = bounded::<PathBuf>(channel_cap);
    let first_error: FirstError = Arc::new(Mutex::new(None));
    let skipped_paths: SkippedPaths = Arc::new(Mutex::new(Vec::new()));

    let probe = ProbeContext {
        suffixes: opts.suffixes.clone(),
        policy: opts.scan_policy,
        root: root.to_path_buf(),
        skip: skip.clone(),
        exclude: opts.exclude.clone(),
        follow_links: opts.follow_links,
        strict: opts.strict,
        first_error: Arc::clone(&first_error),
        skipped_paths: Arc::clone(&skipped_paths),
        bar,
    };
    let ctx = ScanContext {
        root: root.to_path_buf(),
        skip,
        exclude: opts.exclude.clone(),
        strict: opts.strict,
        follow_links: opts.follow_links,
        first_error,
        skipped_paths,
    };

    ScanChannels {
        dir_tx,
        dir_rx,
        found_tx,
        found_rx,
        ctx,
        probe,
    }
}
