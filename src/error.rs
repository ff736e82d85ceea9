//! Error taxonomy. Per-file errors stop at the task boundary; only discovery is fatal.

use std::path::PathBuf;
use thiserror::Error;

/// Why the pool refused a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
    #[error("worker pool is saturated")]
    Saturated,
}

/// Failure while processing one file. Always carries the file's path.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("failed to submit task for {}: {source}", .path.display())]
    Submission { path: PathBuf, source: PoolError },

    #[error("failed to open {}: {source}", .path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decompress {}: {source}", .path.display())]
    Decompression {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode json in {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("task for {} panicked: {message}", .path.display())]
    Panicked { path: PathBuf, message: String },
}

impl FileError {
    pub fn path(&self) -> &std::path::Path {
        match self {
            FileError::Submission { path, .. }
            | FileError::Open { path, .. }
            | FileError::Decompression { path, .. }
            | FileError::Decode { path, .. }
            | FileError::Panicked { path, .. } => path,
        }
    }
}

/// The walk over the input root failed. Nothing is submitted.
#[derive(Debug, Error)]
#[error("failed to find archives under {}: {source}", .root.display())]
pub struct DiscoveryError {
    pub root: PathBuf,
    #[source]
    pub source: walkdir::Error,
}

/// Aggregate signal for a finished run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("encountered {failed} errors while processing {total} files")]
    FilesFailed { failed: usize, total: usize },
}
