//! kdam bars for the two long phases of a run: directory discovery and folder processing.

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

/// Shared between worker threads.
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Which phase a bar reports on.
#[derive(Clone, Copy, Debug)]
pub enum Phase {
    /// Directories probed; the total is unknown while the walk runs.
    Discovery,
    /// Work units finished out of `total`.
    Folders { total: usize },
}

impl Phase {
    fn desc(self) -> &'static str {
        match self {
            Phase::Discovery => "Checking directories",
            Phase::Folders { .. } => "Processing folders",
        }
    }

    fn unit(self) -> &'static str {
        match self {
            Phase::Discovery => " dirs",
            Phase::Folders { .. } => " folders",
        }
    }

    fn total(self) -> usize {
        match self {
            Phase::Discovery => 0,
            Phase::Folders { total } => total,
        }
    }
}

/// Create and draw a bar for `phase`. Drawn immediately so a slow first step still shows 0.
pub fn phase_bar(phase: Phase) -> ProgressBar {
    let bar = Arc::new(Mutex::new(kdam::tqdm!(
        total = phase.total(),
        desc = phase.desc(),
        unit = phase.unit(),
        animation = Animation::Classic,
        position = 0
    )));
    if let Ok(mut b) = bar.lock() {
        let _ = b.refresh();
    }
    bar
}

/// Advance by `n`. Called once per directory or folder, so the lock is never hot.
pub fn advance(bar: &ProgressBar, n: usize) {
    if let Ok(mut b) = bar.lock() {
        let _ = b.update(n);
    }
}

/// Final redraw, then move past the bar so following log lines start clean.
pub fn finish(bar: &ProgressBar) {
    if let Ok(mut b) = bar.lock() {
        let _ = b.refresh();
    }
    eprintln!();
}
