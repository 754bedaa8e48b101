//! Shared fixtures: a line-based fake decoder and helpers to build trees and read the CSV.
#![allow(dead_code)]

use metaharvest::{DecodeError, Decoder, HarvestOpts, TagMap, TagValue};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Decodes text files of `key=value` lines. A line `CORRUPT` fails the decode, a line
/// `PANIC` panics, `key=` yields a missing value. Records every path it was asked to decode.
#[derive(Default)]
pub struct LineDecoder {
    pub seen: Mutex<Vec<PathBuf>>,
}

impl LineDecoder {
    pub fn seen_count(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn saw_under(&self, dir: &Path) -> bool {
        self.seen.lock().unwrap().iter().any(|p| p.starts_with(dir))
    }
}

impl Decoder for LineDecoder {
    fn decode(&self, path: &Path) -> Result<TagMap, DecodeError> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        let text = std::fs::read_to_string(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut map = TagMap::new();
        for line in text.lines() {
            match line.trim() {
                "" => {}
                "CORRUPT" => {
                    return Err(DecodeError::Malformed {
                        path: path.to_path_buf(),
                        reason: "corrupt header".to_string(),
                    });
                }
                "PANIC" => panic!("decoder blew up"),
                l => {
                    let (k, v) = l.split_once('=').unwrap_or((l, ""));
                    let value = if v.is_empty() {
                        TagValue::Missing
                    } else {
                        TagValue::Text(v.to_string())
                    };
                    map.insert(k.to_string(), value);
                }
            }
        }
        Ok(map)
    }
}

/// Write `rel` under `root` with `body`, creating parent dirs.
pub fn write_file(root: &Path, rel: &str, body: &str) -> PathBuf {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path
}

/// Options writing to `out_dir/meta.csv` with small pools.
pub fn opts_for(out_dir: &Path) -> HarvestOpts {
    let mut opts = HarvestOpts {
        output: out_dir.join("meta.csv"),
        ..Default::default()
    };
    opts.workers.folder_workers = 3;
    opts.workers.file_workers = 2;
    opts.workers.chunk_size = 2;
    opts
}

/// Parsed CSV: header and rows as column → cell maps.
pub struct Table {
    pub header: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl Table {
    /// Row whose DicomPath ends with `suffix`.
    pub fn row_for(&self, suffix: &str) -> &BTreeMap<String, String> {
        self.rows
            .iter()
            .find(|r| r["DicomPath"].ends_with(suffix))
            .unwrap_or_else(|| panic!("no row for {suffix}"))
    }
}

pub fn read_table(path: &Path) -> Table {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let header: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    let rows = reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            header
                .iter()
                .cloned()
                .zip(r.iter().map(String::from))
                .collect()
        })
        .collect();
    Table { header, rows }
}
