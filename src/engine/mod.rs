//! Engine: checkpointing, per-folder processing, partial persistence and the final merge.

pub mod arg_parser;
pub mod checkpoint;
pub mod cli;
pub mod merge;
pub mod partials;
pub mod processor;
pub mod progress;
pub mod tools;

pub use arg_parser::Cli;
pub use checkpoint::{CheckpointSet, CheckpointStore};
pub use cli::{build_opts, handle_run};
pub use merge::{merge_and_cleanup, merge_partials, normalize_cell};
pub use partials::{PartialFile, PartialResult, PartialWriter, list_partials, read_partial};
pub use processor::{FolderOutput, FolderProcessor, process_file};
pub use tools::{glob_match, has_target_suffix, path_to_id, should_include_in_walk};
