//! Merge stage: partial files → one CSV, then remove the run's temp state.
//!
//! Two passes over the partial files so the table is never held in memory:
//! 1. schema discovery: which columns have at least one non-missing cell, and which partial file
//!    is the newest for each folder (an older file for the same folder is a leftover from a crash
//!    between partial write and checkpoint mark);
//! 2. streaming write of the surviving rows to a `.tmp` file, renamed over the output path.
//!
//! Temp dir and checkpoint are deleted only after the rename succeeded.

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use crate::MergeOutcome;
use crate::Record;
use crate::engine::checkpoint::CheckpointStore;
use crate::engine::partials::{PartialFile, list_partials, read_partial};
use crate::utils::config::{MISSING_SENTINELS, SOURCE_PATH_FIELD};
use crate::utils::{remove_dir_if_exists, write_atomically};

/// True for cells that mean "no value": the sentinel spellings written upstream.
pub fn is_missing(cell: &str) -> bool {
    MISSING_SENTINELS.contains(&cell)
}

/// Normalize one cell: absent or sentinel → `None`.
pub fn normalize_cell(cell: Option<&String>) -> Option<&str> {
    cell.map(String::as_str).filter(|c| !is_missing(c))
}

/// Final column order: source path first, then every other surviving field sorted.
pub fn order_columns(populated: BTreeSet<String>) -> Vec<String> {
    let mut columns = Vec::with_capacity(populated.len());
    if populated.contains(SOURCE_PATH_FIELD) {
        columns.push(SOURCE_PATH_FIELD.to_string());
    }
    columns.extend(populated.into_iter().filter(|c| c != SOURCE_PATH_FIELD));
    columns
}

/// Which partial files to merge and the columns that survive.
struct MergePlan {
    files: Vec<PartialFile>,
    columns: Vec<String>,
}

/// Pass 1. `files` must be in `(seq, path)` order so the last file seen for a folder is the newest.
fn plan_merge(files: Vec<PartialFile>) -> Result<MergePlan> {
    let mut newest: HashMap<String, usize> = HashMap::new();
    let mut populated_per_file: Vec<BTreeSet<String>> = Vec::with_capacity(files.len());
    for (idx, file) in files.iter().enumerate() {
        let partial = read_partial(&file.path)?;
        if let Some(prev) = newest.insert(partial.folder.clone(), idx) {
            debug!(
                "{} supersedes {} for {}",
                file.path.display(),
                files[prev].path.display(),
                partial.folder
            );
        }
        populated_per_file.push(populated_fields(&partial.records));
    }

    let keep: BTreeSet<usize> = newest.into_values().collect();
    let mut populated = BTreeSet::new();
    let mut kept_files = Vec::with_capacity(keep.len());
    for (idx, (file, fields)) in files.into_iter().zip(populated_per_file).enumerate() {
        if keep.contains(&idx) {
            populated.extend(fields);
            kept_files.push(file);
        }
    }
    Ok(MergePlan {
        files: kept_files,
        columns: order_columns(populated),
    })
}

fn populated_fields(records: &[Record]) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for record in records {
        for (field, value) in record {
            if !is_missing(value) && !out.contains(field) {
                out.insert(field.clone());
            }
        }
    }
    out
}

/// Merge every partial file in `temp_dir` into a CSV at `output`. Does not clean up.
pub fn merge_partials(temp_dir: &Path, output: &Path) -> Result<MergeOutcome> {
    let files = list_partials(temp_dir)?;
    if files.is_empty() {
        return Ok(MergeOutcome::NoData);
    }
    let plan = plan_merge(files)?;
    // Every row carries its source path, so no columns means no rows.
    if plan.columns.is_empty() {
        return Ok(MergeOutcome::NoData);
    }

    let mut rows = 0_usize;
    write_atomically(output, |w| {
        let mut csv_writer = csv::Writer::from_writer(w);
        csv_writer
            .write_record(&plan.columns)
            .context("write CSV header")?;
        for file in &plan.files {
            let partial = read_partial(&file.path)?;
            for record in &partial.records {
                let row = plan
                    .columns
                    .iter()
                    .map(|c| normalize_cell(record.get(c)).unwrap_or(""));
                csv_writer.write_record(row).context("write CSV row")?;
                rows += 1;
            }
        }
        csv_writer.flush().context("flush CSV")?;
        Ok(())
    })
    .with_context(|| format!("write output {}", output.display()))?;

    Ok(MergeOutcome::Written {
        path: output.to_path_buf(),
        rows,
        columns: plan.columns,
    })
}

/// Merge, then delete the temp dir and the checkpoint file. On merge failure nothing is deleted.
pub fn merge_and_cleanup(
    temp_dir: &Path,
    output: &Path,
    checkpoint: &CheckpointStore,
) -> Result<MergeOutcome> {
    info!(
        "Merging partial results into {} and cleaning up temporary files...",
        output.display()
    );
    let outcome = merge_partials(temp_dir, output)?;
    match &outcome {
        MergeOutcome::Written { rows, columns, .. } => {
            info!("Wrote {} rows x {} columns", rows, columns.len());
        }
        MergeOutcome::NoData => info!("No files were processed. No CSV file will be generated."),
    }
    remove_dir_if_exists(temp_dir)?;
    checkpoint.remove()?;
    Ok(outcome)
}
