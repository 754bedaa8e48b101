//! Partial result files: one immutable JSON file per finished folder, merged at the end.
//!
//! Names are `part_<seq>_<uuid>.json`. `seq` orders files for the merge and lets a reprocessed
//! folder supersede an older file for the same folder; the uuid keeps names unique across
//! concurrent writers and reruns.

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::Record;
use crate::utils::write_atomically;

const PART_PREFIX: &str = "part_";
const PART_EXTENSION: &str = "json";

/// Content of one partial file.
#[derive(Debug, Deserialize)]
pub struct PartialResult {
    /// Checkpoint id of the folder these records came from.
    pub folder: String,
    pub seq: usize,
    pub records: Vec<Record>,
}

#[derive(Serialize)]
struct PartialResultRef<'a> {
    folder: &'a str,
    seq: usize,
    records: &'a [Record],
}

/// A partial file found in the temp dir.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartialFile {
    pub seq: usize,
    pub path: PathBuf,
}

/// Writes partial files into one temp dir. Shared by all folder workers.
pub struct PartialWriter {
    dir: PathBuf,
    next_seq: AtomicUsize,
}

impl PartialWriter {
    /// Create the temp dir if needed. Sequence numbers continue after any files already there.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).with_context(|| format!("create temp dir {}", dir.display()))?;
        let next = list_partials(dir)?
            .last()
            .map(|p| p.seq + 1)
            .unwrap_or(0);
        Ok(Self {
            dir: dir.to_path_buf(),
            next_seq: AtomicUsize::new(next),
        })
    }

    /// Persist one folder's records. Returns only after the file is synced and renamed into place.
    pub fn write(&self, folder: &str, records: &[Record]) -> Result<PathBuf> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{PART_PREFIX}{seq}_{}.{PART_EXTENSION}",
            uuid::Uuid::new_v4().simple()
        );
        let path = self.dir.join(name);
        let body = PartialResultRef {
            folder,
            seq,
            records,
        };
        write_atomically(&path, |w| {
            serde_json::to_writer(w, &body).context("serialize partial result")
        })
        .with_context(|| format!("write partial result for {folder}"))?;
        debug!("Wrote {} records to {}", records.len(), path.display());
        Ok(path)
    }
}

/// Parse `part_<seq>_<id>.json`. Other names (including `.tmp` leftovers) are not partial files.
fn parse_partial_name(path: &Path) -> Option<usize> {
    if path.extension().and_then(|e| e.to_str()) != Some(PART_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let rest = stem.strip_prefix(PART_PREFIX)?;
    let (seq, id) = rest.split_once('_')?;
    if id.is_empty() {
        return None;
    }
    seq.parse().ok()
}

/// Partial files in `dir`, ordered by `(seq, path)`. A missing dir has none.
pub fn list_partials(dir: &Path) -> Result<Vec<PartialFile>> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e).with_context(|| format!("list temp dir {}", dir.display())),
    };
    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .with_context(|| format!("list temp dir {}", dir.display()))?
            .path();
        match parse_partial_name(&path) {
            Some(seq) => files.push(PartialFile { seq, path }),
            None => debug!("Ignoring {} in temp dir", path.display()),
        }
    }
    files.sort();
    Ok(files)
}

pub fn read_partial(path: &Path) -> Result<PartialResult> {
    let file = File::open(path).with_context(|| format!("open partial {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse partial {}", path.display()))
}
