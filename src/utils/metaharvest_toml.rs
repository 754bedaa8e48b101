//! Load `.metaharvest.toml` from the input directory (CLI only). Lib callers pass `HarvestOpts`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::utils::config::PackagePaths;
use crate::{Opts, ScanPolicy};

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MetaharvestToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsSection {
    output: Option<String>,
    suffixes: Option<Vec<String>>,
    scan_policy: Option<ScanPolicy>,
    scan_workers: Option<usize>,
    folder_workers: Option<usize>,
    file_workers: Option<usize>,
    chunk_size: Option<usize>,
    exclude: Option<Vec<String>>,
    follow_links: Option<bool>,
    strict: Option<bool>,
    verbose: Option<bool>,
}

/// Load the settings file from `dir`. `Ok(None)` when there is none (or it cannot be read);
/// `Err` when it exists but does not parse. Callers log the error once logging is set up.
pub(crate) fn load_metaharvest_toml(dir: &Path) -> Result<Option<MetaharvestToml>> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let Ok(s) = std::fs::read_to_string(&path) else {
        return Ok(None);
    };
    parse_metaharvest_toml(&s)
        .map(Some)
        .with_context(|| format!("invalid settings file {}", path.display()))
}

pub(crate) fn parse_metaharvest_toml(s: &str) -> Result<MetaharvestToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI.
pub(crate) fn apply_file_to_opts(file: &MetaharvestToml, opts: &mut Opts) {
    let sec = &file.settings;
    if let Some(ref p) = sec.output {
        opts.output = PathBuf::from(p);
    }
    if let Some(ref v) = sec.suffixes {
        opts.suffixes = v.clone();
    }
    if let Some(ref v) = sec.exclude {
        opts.exclude = v.clone();
    }
    apply_file_opt!(sec, opts, scan_policy => scan_policy);
    apply_file_opt!(sec, opts, scan_workers => workers.scan_workers);
    apply_file_opt!(sec, opts, folder_workers => workers.folder_workers);
    apply_file_opt!(sec, opts, file_workers => workers.file_workers);
    apply_file_opt!(sec, opts, chunk_size => workers.chunk_size);
    apply_file_opt!(sec, opts, follow_links => follow_links);
    apply_file_opt!(sec, opts, strict => strict);
    apply_file_opt!(sec, opts, verbose => verbose);
}
