//! CLI run handler: settings file, then flags, then the run.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::decode::DicomDecoder;
use crate::engine::arg_parser::Cli;
use crate::harvest::harvest_dir_with_opts;
use crate::utils::metaharvest_toml::{MetaharvestToml, apply_file_to_opts, load_metaharvest_toml};
use crate::utils::setup_logging;
use crate::{MergeOutcome, Opts};

/// Overwrite opts field from the CLI when given.
macro_rules! apply_cli_opt {
    ($cli:expr, $opts:expr, $cli_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $cli.$cli_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Defaults → `.metaharvest.toml` in DIR → CLI flags. An invalid settings file is ignored.
pub fn build_opts(cli: &Cli) -> Opts {
    let file = load_metaharvest_toml(&cli.dir).ok().flatten();
    opts_with_file(cli, file.as_ref())
}

fn opts_with_file(cli: &Cli, file: Option<&MetaharvestToml>) -> Opts {
    let mut opts = Opts::default();
    if let Some(file) = file {
        apply_file_to_opts(file, &mut opts);
    }
    if let Some(output) = &cli.output {
        opts.output = output.clone();
    }
    if !cli.suffix.is_empty() {
        opts.suffixes = cli.suffix.clone();
    }
    if !cli.exclude.is_empty() {
        opts.exclude = cli.exclude.clone();
    }
    apply_cli_opt!(cli, opts, scan_policy => scan_policy);
    apply_cli_opt!(cli, opts, scan_workers => workers.scan_workers);
    apply_cli_opt!(cli, opts, folder_workers => workers.folder_workers);
    apply_cli_opt!(cli, opts, file_workers => workers.file_workers);
    apply_cli_opt!(cli, opts, chunk_size => workers.chunk_size);
    apply_cli_opt!(cli, opts, follow_links => follow_links);
    apply_cli_opt!(cli, opts, strict => strict);
    apply_cli_opt!(cli, opts, verbose => verbose);
    opts
}

/// Run one harvest with the default decoder. Ctrl+C stops scheduling new folders.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let settings = load_metaharvest_toml(&cli.dir);
    let mut opts = opts_with_file(cli, settings.as_ref().ok().and_then(Option::as_ref));
    setup_logging(opts.verbose);
    if let Err(e) = &settings {
        warn!("{:#}; using defaults and flags only", e);
    }
    debug!("{} CONFIG:{:#?}", env!("CARGO_PKG_NAME").to_uppercase(), opts);

    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_handler = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        cancel_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;
    opts.cancel = Some(cancel);

    info!("Collecting metadata from {}...", cli.dir.display());
    let summary = harvest_dir_with_opts(&cli.dir, &opts, &DicomDecoder)?;
    info!(
        "Folders: {} found, {} already done, {} processed. Files: {} ({} failed to decode)",
        summary.units_found,
        summary.units_skipped,
        summary.units_processed,
        summary.records,
        summary.degraded
    );
    if let MergeOutcome::Written { path, .. } = &summary.merge {
        info!("Done. Output: {}", path.display());
    }
    Ok(())
}
