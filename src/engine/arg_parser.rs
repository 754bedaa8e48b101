use clap::Parser;
use std::path::PathBuf;

use crate::ScanPolicy;

/// Extract metadata from every matching file under a directory tree into one CSV.
/// Interrupted runs resume where they stopped when re-invoked with the same output.
#[derive(Clone, Parser)]
#[command(name = "metaharvest")]
#[command(about = "Extract per-file metadata from a large imaging tree into one CSV; reruns resume.")]
pub struct Cli {
    /// Root directory containing the files.
    #[arg(value_name = "DIR")]
    pub dir: PathBuf,

    /// Output CSV file path. Checkpoint and temp dir are kept next to it. Default: dicom_data.csv.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// File-name suffixes of files to decode. Can specify multiple: -s .dcm .IMA
    #[arg(long, short = 's', num_args = 1..)]
    pub suffix: Vec<String>,

    /// Which directories count as work units.
    #[arg(long, value_enum)]
    pub scan_policy: Option<ScanPolicy>,

    /// Concurrent directory probes during discovery.
    #[arg(long)]
    pub scan_workers: Option<usize>,

    /// Folders processed in parallel.
    #[arg(long)]
    pub folder_workers: Option<usize>,

    /// Threads decoding file chunks.
    #[arg(long)]
    pub file_workers: Option<usize>,

    /// Files per chunk.
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Exclude patterns (glob syntax). Can specify multiple: -e pattern1 pattern2 pattern3
    #[arg(long, short = 'e', num_args = 1..)]
    pub exclude: Vec<String>,

    /// Follow symbolic links.
    #[arg(long, short = 'f', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub follow_links: Option<bool>,

    /// Strict mode: fail on the first unreadable directory instead of skipping it.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub strict: Option<bool>,

    /// Verbose output and progress bars.
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
