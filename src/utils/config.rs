//! Application configuration constants.
//! File names, pool sizes and sentinels in one place.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived paths: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    settings_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// File name of the checkpoint set, placed next to the output file.
    pub const CHECKPOINT_FILENAME: &'static str = "processed_folders.json";
    /// Directory holding one partial result file per finished folder.
    pub const TEMP_DIR_NAME: &'static str = "temp_processing";
    /// Output file used when none is given.
    pub const DEFAULT_OUTPUT: &'static str = "dicom_data.csv";

    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                settings_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// `.metaharvest.toml`, looked up in the input root by the CLI.
    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }
}

/// Where a run keeps its resumable state, derived from the output path.
#[derive(Clone, Debug)]
pub struct StateLayout {
    pub output_dir: PathBuf,
    pub temp_dir: PathBuf,
    pub checkpoint: PathBuf,
}

impl StateLayout {
    /// Output dir is the parent of `output` (`.` for a bare file name).
    pub fn for_output(output: &Path) -> Self {
        let output_dir = match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        StateLayout {
            temp_dir: output_dir.join(PackagePaths::TEMP_DIR_NAME),
            checkpoint: output_dir.join(PackagePaths::CHECKPOINT_FILENAME),
            output_dir,
        }
    }
}

// ---- Worker pools ----

/// Default pool sizes. Discovery is I/O-bound and stays small; processing is CPU-bound.
#[derive(Clone, Copy, Debug)]
pub struct WorkerLimits {
    /// Concurrent directory probes during discovery.
    pub scan_workers: usize,
    /// Folders processed at once.
    pub folder_workers: usize,
    /// Threads decoding file chunks, shared by all folders.
    pub file_workers: usize,
    /// Files per chunk submitted to the file pool.
    pub chunk_size: usize,
}

impl Default for WorkerLimits {
    fn default() -> Self {
        Self {
            scan_workers: Self::SCAN_WORKERS,
            folder_workers: Self::FOLDER_WORKERS,
            file_workers: Self::FILE_WORKERS,
            chunk_size: Self::CHUNK_SIZE,
        }
    }
}

impl WorkerLimits {
    pub const SCAN_WORKERS: usize = 4;
    pub const FOLDER_WORKERS: usize = 12;
    pub const FILE_WORKERS: usize = 6;
    pub const CHUNK_SIZE: usize = 6;

    /// Clamp every field to at least 1.
    pub fn sanitized(self) -> Self {
        Self {
            scan_workers: self.scan_workers.max(1),
            folder_workers: self.folder_workers.max(1),
            file_workers: self.file_workers.max(1),
            chunk_size: self.chunk_size.max(1),
        }
    }
}

// ---- Records ----

/// Field holding the source file path in every record.
pub const SOURCE_PATH_FIELD: &str = "DicomPath";

/// Field holding the failure message in a degraded record.
pub const ERROR_FIELD: &str = "Error";

/// What the stringifier writes for an absent value.
pub const MISSING_MARKER: &str = "N/A";

/// Cell spellings the merge treats as missing.
pub const MISSING_SENTINELS: [&str; 4] = ["", "N/A", "None", "NONE"];

/// Default file-name suffix of decodable files.
pub const DEFAULT_SUFFIX: &str = ".dcm";

// ---- Discovery channels ----

/// Capacity of the directory and result channels between walk thread and probe workers.
pub const SCAN_CHANNEL_CAP: usize = 10_000;
