pub mod config;
pub mod logger;
pub mod metaharvest_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::setup_logging;
pub use tempfiles::{
    remove_dir_if_exists, remove_file_if_exists, rename_temp_to_final, temp_path_for,
    write_atomically,
};
