//! Folder processor: decode every matching file in one folder on the shared file pool.

use anyhow::Result;
use log::debug;
use rayon::ThreadPool;
use rayon::prelude::*;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use crate::decode::stringify::stringify_map;
use crate::decode::{DecodeError, Decoder};
use crate::engine::tools::list_target_files;
use crate::utils::config::{ERROR_FIELD, SOURCE_PATH_FIELD};
use crate::{Record, WorkUnit};

/// Records of one folder, in file-name order.
#[derive(Debug, Default)]
pub struct FolderOutput {
    pub records: Vec<Record>,
    /// How many of `records` are degraded (decode failed).
    pub degraded: usize,
}

/// One record per file plus whether it is degraded.
type FileOutcome = (Record, bool);

pub struct FolderProcessor<'a> {
    decoder: &'a dyn Decoder,
    file_pool: &'a ThreadPool,
    suffixes: &'a [String],
    chunk_size: usize,
}

impl<'a> FolderProcessor<'a> {
    pub fn new(
        decoder: &'a dyn Decoder,
        file_pool: &'a ThreadPool,
        suffixes: &'a [String],
        chunk_size: usize,
    ) -> Self {
        Self {
            decoder,
            file_pool,
            suffixes,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Split the folder's files into chunks, decode the chunks on the file pool and wait for all
    /// of them. Fails only when the folder itself cannot be listed.
    pub fn process(&self, unit: &WorkUnit) -> Result<FolderOutput> {
        let files = list_target_files(&unit.path, self.suffixes)?;
        let decoder = self.decoder;
        // Called from a folder-pool thread. While it waits for the file pool, that thread may
        // run other folder jobs from its own pool, nested on this stack. No lock is held here.
        let chunk_results: Vec<Vec<FileOutcome>> = self.file_pool.install(|| {
            files
                .par_chunks(self.chunk_size)
                .map(|chunk| process_chunk(decoder, chunk))
                .collect()
        });

        let mut out = FolderOutput {
            records: Vec::with_capacity(files.len()),
            degraded: 0,
        };
        for (record, degraded) in chunk_results.into_iter().flatten() {
            out.degraded += usize::from(degraded);
            out.records.push(record);
        }
        Ok(out)
    }
}

/// Decode a chunk sequentially on the current worker.
fn process_chunk(decoder: &dyn Decoder, chunk: &[PathBuf]) -> Vec<FileOutcome> {
    chunk.iter().map(|path| process_file(decoder, path)).collect()
}

/// Decode and stringify one file. Any failure, including a decoder panic, yields a degraded
/// record with just the source path and the error message.
pub fn process_file(decoder: &dyn Decoder, path: &Path) -> FileOutcome {
    let source = path.to_string_lossy().into_owned();
    match catch_unwind(AssertUnwindSafe(|| decoder.decode(path))) {
        Ok(Ok(map)) => {
            let mut record = stringify_map(map);
            record.insert(SOURCE_PATH_FIELD.to_string(), source);
            (record, false)
        }
        Ok(Err(e)) => (degraded_record(source, &e), true),
        Err(panic) => {
            let msg = panic_message(panic.as_ref());
            let e = DecodeError::Malformed {
                path: path.to_path_buf(),
                reason: format!("decoder panicked: {msg}"),
            };
            (degraded_record(source, &e), true)
        }
    }
}

fn degraded_record(source: String, err: &DecodeError) -> Record {
    debug!("Error processing file {}: {}", source, err);
    let mut record = Record::new();
    record.insert(ERROR_FIELD.to_string(), err.to_string());
    record.insert(SOURCE_PATH_FIELD.to_string(), source);
    record
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
