//! Shared state for one batch run: the only data touched by more than one worker.

use log::error;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::FailureCounter;
use crate::engine::progress::{ProgressBar, update_progress_bar};
use crate::error::FileError;

/// State every job holds an `Arc` to. Everything else a job needs is owned by its `Task`.
#[derive(Default)]
pub struct BatchContext {
    pub failed: FailureCounter,
    /// `(file, error)` pairs; `None` unless per-file detail was requested.
    pub failures: Option<Mutex<Vec<(PathBuf, String)>>>,
    pub bar: Option<ProgressBar>,
}

impl BatchContext {
    pub fn new(record_failures: bool, bar: Option<ProgressBar>) -> Self {
        Self {
            failed: FailureCounter::new(),
            failures: record_failures.then(|| Mutex::new(Vec::new())),
            bar,
        }
    }

    /// Log a per-file failure, count it, and keep the detail when requested.
    pub fn report_failure(&self, err: &FileError) {
        error!("{}", err);
        self.failed.increment();
        if let Some(failures) = &self.failures
            && let Ok(mut failures) = failures.lock()
        {
            failures.push((err.path().to_path_buf(), err.to_string()));
        }
    }

    /// One file finished (either way).
    pub fn file_done(&self) {
        if let Some(bar) = &self.bar {
            update_progress_bar(bar, 1);
        }
    }

    /// Take the collected `(file, error)` pairs, sorted by path for stable output.
    pub fn take_failures(&self) -> Vec<(PathBuf, String)> {
        let mut out = self
            .failures
            .as_ref()
            .and_then(|f| f.lock().ok().map(|mut v| std::mem::take(&mut *v)))
            .unwrap_or_default();
        out.sort();
        out
    }
}
