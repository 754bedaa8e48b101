use anyhow::Result;
use log::{debug, info};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::engine::progress::{Phase, finish, phase_bar};
use crate::utils::config::SCAN_CHANNEL_CAP;
use crate::{Opts, WorkUnit};

use super::context::{ScanHandles, create_scan_channels};
use super::error_handler::check_for_initial_error_or_skipped_paths;
use super::probe::spawn_probe_workers;
use super::walk::spawn_walk_thread;

/// Start the walk thread and probe workers. Caller receives from `found_rx` and must join
/// `walk_handle` and `worker_handles` when the channel closes.
pub fn run_scan(root: &Path, opts: &Opts, skip: Vec<PathBuf>) -> ScanHandles {
    let bar = opts.verbose.then(|| phase_bar(Phase::Discovery));
    let channels = create_scan_channels(root, skip, opts, SCAN_CHANNEL_CAP, bar.clone());

    let walk_handle = spawn_walk_thread(channels.dir_tx, channels.ctx);
    let worker_handles = spawn_probe_workers(
        channels.dir_rx,
        &channels.found_tx,
        &channels.probe,
        opts.workers.scan_workers,
    );

    // Dropping the last sender closes the channel once workers exit.
    drop(channels.found_tx);

    ScanHandles {
        found_rx: channels.found_rx,
        walk_handle,
        worker_handles,
        first_error: channels.probe.first_error,
        skipped_paths: channels.probe.skipped_paths,
        bar,
    }
}

/// Main scan: every leaf work unit under `root`, deduplicated and sorted.
/// Walk → dir channel → probe workers → found channel → set.
pub fn find_work_units(root: &Path, opts: &Opts, skip: Vec<PathBuf>) -> Result<Vec<WorkUnit>> {
    let ScanHandles {
        found_rx,
        walk_handle,
        worker_handles,
        first_error,
        skipped_paths,
        bar,
    } = run_scan(root, opts, skip);

    let mut found = BTreeSet::new();
    while let Ok(dir) = found_rx.recv() {
        found.insert(dir);
    }

    let walk_stats = walk_handle
        .join()
        .map_err(|_| anyhow::anyhow!("walk thread panicked"))?;
    for h in worker_handles {
        h.join()
            .map_err(|_| anyhow::anyhow!("probe worker panicked"))?;
    }
    if let Some(bar) = &bar {
        finish(bar);
    }
    debug!(
        "scan: {} directories walked, {} unreadable",
        walk_stats.sent, walk_stats.unreadable
    );

    check_for_initial_error_or_skipped_paths(opts.strict, opts.verbose, &first_error, &skipped_paths)?;

    info!("Found {} folders with matching files", found.len());
    Ok(found.into_iter().map(WorkUnit::new).collect())
}
