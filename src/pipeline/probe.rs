use crossbeam_channel::{Receiver, Sender};
use log::debug;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

use crate::ScanPolicy;
use crate::engine::progress::advance;
use crate::engine::tools::{dir_has_target_file, should_include_in_walk};

use super::context::ProbeContext;
use super::error_handler::record_scan_error;

/// Single probe worker: read directories from dir_rx, send the qualifying ones on found_tx.
fn probe_worker_loop(dir_rx: Receiver<PathBuf>, found_tx: Sender<PathBuf>, probe: ProbeContext) {
    while let Ok(dir) = dir_rx.recv() {
        let found = match probe.policy {
            ScanPolicy::Immediate => probe_immediate(&dir, &probe),
            ScanPolicy::Subtree => probe_subtree(&dir, &probe),
        };
        if let Some(bar) = &probe.bar {
            advance(bar, 1);
        }
        if let Some(found) = found
            && found_tx.send(found).is_err()
        {
            break;
        }
    }
    drop(found_tx);
}

/// Spawn probe workers. Caller must drop its own `found_tx` afterwards so the result channel
/// closes once all workers exit.
pub fn spawn_probe_workers(
    dir_rx: Receiver<PathBuf>,
    found_tx: &Sender<PathBuf>,
    probe: &ProbeContext,
    num_workers: usize,
) -> Vec<JoinHandle<()>> {
    (0..num_workers.max(1))
        .map(|_| {
            let dir_rx = dir_rx.clone();
            let found_tx = found_tx.clone();
            let probe = probe.clone();
            thread::spawn(move || probe_worker_loop(dir_rx, found_tx, probe))
        })
        .collect()
}

/// `dir` itself, when it directly holds a matching file.
fn probe_immediate(dir: &Path, probe: &ProbeContext) -> Option<PathBuf> {
    match dir_has_target_file(dir, &probe.suffixes) {
        Ok(true) => Some(dir.to_path_buf()),
        Ok(false) => None,
        Err(e) => {
            record_scan_error(
                probe.strict,
                &probe.first_error,
                &probe.skipped_paths,
                dir.to_path_buf(),
                e.to_string(),
            );
            None
        }
    }
}

/// First directory at or below `dir` (sorted walk order) that directly holds a matching file.
/// Unreadable entries below `dir` are left to their own probe.
fn probe_subtree(dir: &Path, probe: &ProbeContext) -> Option<PathBuf> {
    let walker = WalkDir::new(dir)
        .follow_links(probe.follow_links)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            e.file_type().is_dir()
                && should_include_in_walk(e.path(), &probe.root, &probe.skip, &probe.exclude)
        });
    for entry in walker {
        match entry {
            Ok(entry) => {
                if let Ok(true) = dir_has_target_file(entry.path(), &probe.suffixes) {
                    return Some(entry.into_path());
                }
            }
            Err(e) => debug!("subtree probe of {}: {}", dir.display(), e),
        }
    }
    None
}
