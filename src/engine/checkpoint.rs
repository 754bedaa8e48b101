//! Checkpoint store: the set of folder ids already fully processed, in one JSON file.
//!
//! Every access holds a file lock on the checkpoint file itself: shared for [`CheckpointStore::load`],
//! exclusive for the whole read-modify-write in [`CheckpointStore::mark_done`]. The lock is an
//! OS file lock, so concurrent threads and concurrent processes serialize the same way.
//! The file is rewritten in place rather than replaced by rename, because waiters hold a lock on
//! the current inode.

use anyhow::{Context, Result};
use log::warn;
use std::collections::BTreeSet;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::utils::remove_file_if_exists;

/// Ids of folders whose partial result file is durable.
pub type CheckpointSet = BTreeSet<String>;

#[derive(Clone, Debug)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current set. A missing file is an empty set; so is an empty or corrupt one.
    pub fn load(&self) -> Result<CheckpointSet> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(CheckpointSet::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("open checkpoint {}", self.path.display()));
            }
        };
        file.lock_shared()
            .with_context(|| format!("lock checkpoint {}", self.path.display()))?;
        let set = read_set(&mut file, &self.path);
        file.unlock()
            .with_context(|| format!("unlock checkpoint {}", self.path.display()))?;
        set
    }

    /// Add `id` to the set. The exclusive lock covers load, insert and write-back.
    pub fn mark_done(&self, id: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.path)
            .with_context(|| format!("open checkpoint {}", self.path.display()))?;
        file.lock()
            .with_context(|| format!("lock checkpoint {}", self.path.display()))?;
        let result = (|| -> Result<()> {
            let mut set = read_set(&mut file, &self.path)?;
            if !set.insert(id.to_string()) {
                return Ok(());
            }
            let bytes = serde_json::to_vec(&set).context("serialize checkpoint set")?;
            file.set_len(0)?;
            file.seek(SeekFrom::Start(0))?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            Ok(())
        })()
        .with_context(|| format!("update checkpoint {}", self.path.display()));
        file.unlock()
            .with_context(|| format!("unlock checkpoint {}", self.path.display()))?;
        result
    }

    /// Delete the checkpoint file (after a successful merge).
    pub fn remove(&self) -> Result<()> {
        remove_file_if_exists(&self.path)
    }
}

/// Read the whole file from the start. Unparseable content counts as no progress.
fn read_set(file: &mut File, path: &Path) -> Result<CheckpointSet> {
    let mut buf = Vec::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_end(&mut buf)
        .with_context(|| format!("read checkpoint {}", path.display()))?;
    if buf.iter().all(u8::is_ascii_whitespace) {
        return Ok(CheckpointSet::new());
    }
    match serde_json::from_slice::<Vec<String>>(&buf) {
        Ok(ids) => Ok(ids.into_iter().collect()),
        Err(e) => {
            warn!(
                "Checkpoint {} is unreadable ({}); treating as no prior progress",
                path.display(),
                e
            );
            Ok(CheckpointSet::new())
        }
    }
}
