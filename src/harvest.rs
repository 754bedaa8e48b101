//! Run orchestration: scan, skip checkpointed folders, process the rest in parallel, merge.
//!
//! Per folder the order is fixed: records are decoded, the partial file is durably written, and
//! only then the folder is marked done. A crash anywhere leaves either an unmarked folder (redone
//! next run) or a marked folder whose partial file exists.

use anyhow::{Context, Result};
use log::{info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::decode::Decoder;
use crate::engine::checkpoint::CheckpointStore;
use crate::engine::merge::merge_and_cleanup;
use crate::engine::partials::PartialWriter;
use crate::engine::processor::FolderProcessor;
use crate::engine::progress::{Phase, ProgressBar, advance, finish, phase_bar};
use crate::engine::tools::canonical_root;
use crate::pipeline::find_work_units;
use crate::utils::config::StateLayout;
use crate::{Opts, RunSummary, WorkUnit};

/// Counters shared by folder workers.
#[derive(Default)]
struct RunCounters {
    processed: AtomicUsize,
    failed: AtomicUsize,
    records: AtomicUsize,
    degraded: AtomicUsize,
}

/// Everything a folder worker needs, borrowed for the duration of the pool.
struct FolderJob<'a> {
    processor: FolderProcessor<'a>,
    writer: &'a PartialWriter,
    checkpoint: &'a CheckpointStore,
    counters: &'a RunCounters,
}

impl FolderJob<'_> {
    /// Decode → persist partial → mark done. `Err` only for persistence failures, which stop the
    /// run. A folder that cannot be listed stays unmarked and blocks the merge.
    fn run(&self, unit: &WorkUnit) -> Result<()> {
        let output = match self.processor.process(unit) {
            Ok(o) => o,
            Err(e) => {
                warn!("Skipping folder {}: {:#}", unit.path.display(), e);
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                return Ok(());
            }
        };
        let id = unit.id();
        self.writer.write(&id, &output.records)?;
        self.checkpoint.mark_done(&id)?;

        self.counters.processed.fetch_add(1, Ordering::Relaxed);
        self.counters
            .records
            .fetch_add(output.records.len(), Ordering::Relaxed);
        self.counters
            .degraded
            .fetch_add(output.degraded, Ordering::Relaxed);
        Ok(())
    }
}

fn build_pool(num_threads: usize, name: &'static str) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .thread_name(move |i| format!("{name}-{i}"))
        .build()
        .with_context(|| format!("build {name} thread pool"))
}

/// The temp dir, so the scan never descends into it when the output sits under the input root.
fn state_paths_to_skip(layout: &StateLayout) -> Vec<PathBuf> {
    layout.temp_dir.canonicalize().into_iter().collect()
}

fn cancelled(opts: &Opts) -> bool {
    opts.cancel
        .as_ref()
        .is_some_and(|c| c.load(Ordering::Relaxed))
}

/// Extract metadata for every work unit under `root` into `opts.output`, resuming any previous
/// incomplete run that wrote to the same output path.
pub fn harvest_dir_with_opts(root: &Path, opts: &Opts, decoder: &dyn Decoder) -> Result<RunSummary> {
    let root = canonical_root(root)?;
    let layout = StateLayout::for_output(&opts.output);
    std::fs::create_dir_all(&layout.output_dir)
        .with_context(|| format!("create output dir {}", layout.output_dir.display()))?;
    let workers = opts.workers.sanitized();

    let writer = PartialWriter::open(&layout.temp_dir)?;
    let checkpoint = CheckpointStore::new(&layout.checkpoint);

    let units = find_work_units(&root, opts, state_paths_to_skip(&layout))?;
    let done = checkpoint.load()?;
    let (skipped, remaining): (Vec<WorkUnit>, Vec<WorkUnit>) =
        units.iter().cloned().partition(|u| done.contains(&u.id()));
    if !skipped.is_empty() {
        info!(
            "Resuming: {} of {} folders already processed",
            skipped.len(),
            units.len()
        );
    }

    let folder_pool = build_pool(workers.folder_workers, "folder")?;
    let file_pool = build_pool(workers.file_workers, "file")?;
    let counters = RunCounters::default();
    let job = FolderJob {
        processor: FolderProcessor::new(decoder, &file_pool, &opts.suffixes, workers.chunk_size),
        writer: &writer,
        checkpoint: &checkpoint,
        counters: &counters,
    };
    let fatal: Mutex<Option<anyhow::Error>> = Mutex::new(None);
    let bar: Option<ProgressBar> = opts.verbose.then(|| {
        phase_bar(Phase::Folders {
            total: remaining.len(),
        })
    });

    folder_pool.install(|| {
        remaining.par_iter().for_each(|unit| {
            if cancelled(opts) || fatal.lock().unwrap().is_some() {
                return;
            }
            if let Err(e) = job.run(unit) {
                fatal.lock().unwrap().get_or_insert(e);
            }
            if let Some(bar) = &bar {
                advance(bar, 1);
            }
        })
    });
    if let Some(bar) = &bar {
        finish(bar);
    }

    if let Some(e) = fatal.into_inner().unwrap() {
        return Err(e.context(format!(
            "run stopped; partial results kept in {} for resume",
            layout.temp_dir.display()
        )));
    }
    if cancelled(opts) {
        anyhow::bail!(
            "cancelled by user after {} folders; rerun with the same output to resume",
            counters.processed.load(Ordering::Relaxed)
        );
    }
    // Unmarked folders would be missing from the table; keep state so a rerun redoes only them.
    let failed = counters.failed.load(Ordering::Relaxed);
    if failed > 0 {
        anyhow::bail!(
            "{} folders could not be read; partial results kept in {}. Rerun with the same output to retry them",
            failed,
            layout.temp_dir.display()
        );
    }

    let merge = merge_and_cleanup(&layout.temp_dir, &opts.output, &checkpoint)?;
    Ok(RunSummary {
        units_found: units.len(),
        units_skipped: skipped.len(),
        units_processed: counters.processed.into_inner(),
        records: counters.records.into_inner(),
        degraded: counters.degraded.into_inner(),
        merge,
    })
}
