//! Public and internal types for the metaharvest API and pipeline.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use serde::Deserialize;

use crate::utils::config::{DEFAULT_SUFFIX, PackagePaths, WorkerLimits};

/// One leaf folder scheduled for processing. Produced by the scanner, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WorkUnit {
    pub path: PathBuf,
}

impl WorkUnit {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Identifier stored in the checkpoint set and in partial files.
    pub fn id(&self) -> String {
        crate::engine::tools::path_to_id(&self.path)
    }
}

/// One file's stringified metadata: field name → value. Field sets differ between records.
pub type Record = BTreeMap<String, String>;

/// Which directories count as work units during discovery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ScanPolicy {
    /// A directory qualifies when it directly contains a matching file.
    #[default]
    Immediate,
    /// Each visited directory reports the first directory at or below it (walk order) that
    /// directly contains a matching file. Finds the same set as `Immediate` with more I/O,
    /// but tolerates directories whose own listing flakes.
    Subtree,
}

/// Lib-only options for [`harvest_dir`](crate::harvest_dir).
#[derive(Clone, Debug)]
pub struct HarvestOpts {
    /// Final CSV path. Checkpoint and temp dir live next to it.
    pub output: PathBuf,
    /// File-name suffixes of decodable files (e.g. `.dcm`). Matched case-sensitively.
    pub suffixes: Vec<String>,
    pub scan_policy: ScanPolicy,
    pub workers: WorkerLimits,
    /// Exclude patterns (glob syntax, matched against names and full paths).
    pub exclude: Vec<String>,
    /// Follow symbolic links during discovery.
    pub follow_links: bool,
    /// Fail on the first unreadable directory instead of skipping it.
    pub strict: bool,
}

impl Default for HarvestOpts {
    fn default() -> Self {
        Self {
            output: PathBuf::from(PackagePaths::DEFAULT_OUTPUT),
            suffixes: vec![DEFAULT_SUFFIX.to_string()],
            scan_policy: ScanPolicy::default(),
            workers: WorkerLimits::default(),
            exclude: Vec::new(),
            follow_links: false,
            strict: false,
        }
    }
}

impl From<&HarvestOpts> for Opts {
    fn from(o: &HarvestOpts) -> Self {
        Opts {
            output: o.output.clone(),
            suffixes: o.suffixes.clone(),
            scan_policy: o.scan_policy,
            workers: o.workers,
            exclude: o.exclude.clone(),
            follow_links: o.follow_links,
            strict: o.strict,
            verbose: false,
            cancel: None,
        }
    }
}

/// Full options (CLI). Use [`HarvestOpts`] for lib.
#[derive(Clone, Debug)]
pub struct Opts {
    pub output: PathBuf,
    pub suffixes: Vec<String>,
    pub scan_policy: ScanPolicy,
    pub workers: WorkerLimits,
    pub exclude: Vec<String>,
    pub follow_links: bool,
    pub strict: bool,
    /// Show progress bars.
    pub verbose: bool,
    /// Set by the Ctrl+C handler; workers stop taking new folders once it is true.
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for Opts {
    fn default() -> Self {
        Opts::from(&HarvestOpts::default())
    }
}

/// What the final merge produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Table written to `path` with `rows` data rows under `columns`.
    Written {
        path: PathBuf,
        rows: usize,
        columns: Vec<String>,
    },
    /// No partial results existed; nothing written.
    NoData,
}

/// Counters for one run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    /// Work units found by the scanner.
    pub units_found: usize,
    /// Units skipped because the checkpoint already had them.
    pub units_skipped: usize,
    /// Units processed and checkpointed in this run.
    pub units_processed: usize,
    /// Records produced in this run (full and degraded).
    pub records: usize,
    /// Degraded records (decode failures) produced in this run.
    pub degraded: usize,
    pub merge: MergeOutcome,
}
