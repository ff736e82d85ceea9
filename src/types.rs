//! Public and internal types for the gzfeed API and pipeline.

use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::BatchError;

/// One unit of work: a single archive to decode. Moved into exactly one pool job.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Task {
    pub source_path: PathBuf,
}

impl Task {
    pub fn new(source_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
        }
    }
}

/// Deserialize a field where JSON `null` means the same as an absent key: the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Author name pair as it appears in a Crossref work item.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Author {
    #[serde(alias = "Given", default, deserialize_with = "null_as_default")]
    pub given: String,
    #[serde(alias = "Family", default, deserialize_with = "null_as_default")]
    pub family: String,
}

/// A decoded work item. Unknown fields in the source JSON are ignored; missing or `null` ones
/// default. Keys match exactly or by the listed case variants.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Record {
    #[serde(
        rename = "DOI",
        alias = "doi",
        alias = "Doi",
        default,
        deserialize_with = "null_as_default"
    )]
    pub doi: String,
    #[serde(alias = "Title", default, deserialize_with = "null_as_default")]
    pub title: Vec<String>,
    #[serde(
        rename = "references-count",
        alias = "References-Count",
        alias = "referencescount",
        alias = "ReferencesCount",
        default,
        deserialize_with = "null_as_default"
    )]
    pub references_count: i64,
    #[serde(alias = "Author", default, deserialize_with = "null_as_default")]
    pub author: Vec<Author>,
}

/// One top-level JSON value from the decompressed stream.
///
/// An empty, absent, or `null` `items` list is valid and produces no sink calls.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct DecodedBatch {
    #[serde(alias = "Items", default, deserialize_with = "null_as_default")]
    pub items: Vec<Record>,
}

/// Shared failure count. Only increment-and-read is exposed; workers never touch the raw atomic.
#[derive(Debug, Default)]
pub struct FailureCounter(AtomicUsize);

impl FailureCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one failure and return the new total.
    pub fn increment(&self) -> usize {
        self.0.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }
}

/// Aggregate result of one run.
///
/// `failures` carries per-file detail only when [`Opts::record_failures`] is set; otherwise the
/// count is the whole story and the detail lives in the log.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub total_submitted: usize,
    pub failed: usize,
    /// True when a cancel request stopped submission before every file was handed to the pool.
    pub cancelled: bool,
    pub failures: Vec<(PathBuf, String)>,
}

impl BatchOutcome {
    pub fn succeeded(&self) -> usize {
        self.total_submitted - self.failed
    }

    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    /// Collapse into the aggregate "N files failed" signal.
    pub fn into_result(self) -> std::result::Result<Self, BatchError> {
        if self.failed > 0 {
            return Err(BatchError::FilesFailed {
                failed: self.failed,
                total: self.total_submitted,
            });
        }
        Ok(self)
    }
}

/// Lib-only options for [`run`](crate::run). Only the fields that apply when driving the pipeline
/// from code (no log file, no progress bar).
#[derive(Clone, Debug, Default)]
pub struct GzfeedOpts {
    /// Worker count. When None, derived from available threads and the open-file limit.
    pub workers: Option<usize>,
    /// Pending-job queue capacity. When None, equals the worker count.
    pub queue_cap: Option<usize>,
    /// Reject submissions with `PoolError::Saturated` instead of waiting for a free slot.
    pub nonblocking: bool,
    /// File extension to discover (without the dot). Empty means the default (`gz`).
    pub extension: String,
    /// Keep `(file, error)` pairs in [`BatchOutcome::failures`].
    pub record_failures: bool,
}

impl From<&GzfeedOpts> for Opts {
    fn from(o: &GzfeedOpts) -> Self {
        Opts {
            workers: o.workers,
            queue_cap: o.queue_cap,
            nonblocking: o.nonblocking,
            extension: o.extension.clone(),
            record_failures: o.record_failures,
            ..Default::default()
        }
    }
}

/// Full options (CLI). Use [`GzfeedOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// Directory tree to search for archives.
    pub input_root: PathBuf,
    /// Output directory. Created by the CLI; not written by the pipeline.
    pub output_dir: Option<PathBuf>,
    /// Worker count. When None, derived from available threads and the open-file limit.
    pub workers: Option<usize>,
    /// Pending-job queue capacity. When None, equals the worker count.
    pub queue_cap: Option<usize>,
    /// Reject submissions instead of waiting when the queue is full.
    pub nonblocking: bool,
    /// File extension to discover (without the dot). Empty means the default (`gz`).
    pub extension: String,
    /// Append log lines to this file as well as stdout.
    pub log_path: Option<PathBuf>,
    /// Keep `(file, error)` pairs in the outcome and print them at the end.
    pub record_failures: bool,
    /// Show a progress bar of completed files.
    pub progress: bool,
    /// Debug-level logging for this crate.
    pub verbose: bool,
    /// Exit nonzero when any file failed (CLI).
    pub fail_on_error: bool,
    /// Raised to stop submitting further files (Ctrl+C in the CLI).
    pub cancel: Option<Arc<AtomicBool>>,
}
