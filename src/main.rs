//! Metaharvest CLI: extract metadata from DIR into one CSV; rerun to resume.

use anyhow::Result;
use clap::Parser;
use metaharvest::engine::arg_parser::Cli;
use metaharvest::engine::handle_run;
use std::time::Instant;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
