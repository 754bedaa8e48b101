//! Folder discovery: a sequential walk feeding a small pool of probe workers.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod probe;
pub mod walk;

pub use context::{ProbeContext, ScanChannels, ScanContext, ScanHandles, create_scan_channels};
pub use error_handler::{check_for_initial_error_or_skipped_paths, record_scan_error};
pub use orchestrator::{find_work_units, run_scan};
pub use probe::spawn_probe_workers;
pub use walk::{WalkStats, run_walk_loop, spawn_walk_thread};
