use colored::Colorize;
use env_logger::Builder;
use env_logger::fmt::Formatter;
use log::{Level, LevelFilter};
use std::io::Write;

/// Init env_logger: dependencies at warn, this crate at info (debug when verbose).
/// Later calls are no-ops.
pub fn setup_logging(verbose: bool) {
    let crate_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    let _ = Builder::from_default_env()
        .filter_level(LevelFilter::Warn)
        .filter_module(env!("CARGO_PKG_NAME"), crate_level)
        .format(format_record)
        .try_init();
}

/// `[metaharvest] msg` for info; warnings and errors also name where they came from.
fn format_record(buf: &mut Formatter, record: &log::Record) -> std::io::Result<()> {
    let name = env!("CARGO_PKG_NAME").cyan();
    match record.level() {
        Level::Error | Level::Warn => {
            let level = if record.level() == Level::Error {
                "ERROR".red()
            } else {
                "WARN".yellow()
            };
            // Pool threads are named `folder-N` and `file-N`; anything else reports its module.
            let thread = std::thread::current();
            let origin = thread
                .name()
                .filter(|n| *n != "main")
                .unwrap_or(record.target());
            writeln!(buf, "[{} {} {}] {}", name, level, origin.white(), record.args())
        }
        Level::Info => writeln!(buf, "[{}] {}", name, record.args()),
        Level::Debug | Level::Trace => {
            writeln!(buf, "[{} {}] {}", name, "debug".dimmed(), record.args())
        }
    }
}
