//! Progress bar utilities for displaying completed files

use kdam::{Animation, Bar, BarExt};
use std::sync::{Arc, Mutex};

// Progress bar type alias
pub type ProgressBar = Arc<Mutex<Bar>>;

/// Configuration for creating a progress bar
pub struct ProgressBarConfig {
    pub total: usize,
    pub desc: &'static str,
    pub animation: Animation,
}

impl ProgressBarConfig {
    /// Create a new progress bar configuration
    pub fn new(total: usize, desc: &'static str, animation: Animation) -> Self {
        Self {
            total,
            desc,
            animation,
        }
    }
}

/// Create a progress bar with the given configuration
pub fn create_progress_bar(config: ProgressBarConfig) -> ProgressBar {
    Arc::new(Mutex::new(kdam::tqdm!(
        total = config.total,
        desc = config.desc,
        animation = config.animation,
        unit = " files"
    )))
}

/// Update progress bar by `n`.
/// Uses try_lock so a worker never waits on the bar; a skipped tick is caught up by `finish_bar`.
pub fn update_progress_bar(pb: &ProgressBar, n: usize) {
    if let Ok(mut pb) = pb.try_lock() {
        let _ = pb.update(n);
    }
}

/// Jump the bar to `done` and redraw. Call once after all workers have joined.
pub fn finish_bar(pb: &ProgressBar, done: usize) {
    if let Ok(mut bar) = pb.lock() {
        let _ = bar.update_to(done);
        let _ = bar.refresh();
        eprintln!();
    }
}
