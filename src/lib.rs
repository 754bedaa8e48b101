//! Metaharvest: resumable parallel metadata extraction for very large imaging trees.
//!
//! A run finds every leaf folder holding matching files, decodes each folder's files in
//! parallel, persists one partial result file per folder and checkpoints it, then merges all
//! partial files into one CSV. Re-invoking with the same output path resumes an interrupted run.

pub mod decode;
pub mod engine;
pub mod harvest;
pub mod pipeline;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use decode::{DecodeError, Decoder, DicomDecoder, TagMap, TagValue};

use log::debug;
use std::path::Path;

/// Result alias used by public metaharvest API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: harvest `root` into `opts.output` and return the run's counters.
///
/// - **`decoder: None`** → the built-in [`DicomDecoder`].
/// - **`decoder: Some(d)`** → any [`Decoder`]; it is called from many threads at once.
///
/// Folders already recorded in the checkpoint next to `opts.output` are not decoded again.
pub fn harvest_dir(
    root: &Path,
    opts: &HarvestOpts,
    decoder: Option<&dyn Decoder>,
) -> Result<RunSummary> {
    let opts = Opts::from(opts);
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    match decoder {
        Some(d) => harvest::harvest_dir_with_opts(root, &opts, d),
        None => harvest::harvest_dir_with_opts(root, &opts, &DicomDecoder),
    }
}
